//! Owned frame storage.
//!
//! [`RawBuffer`] is the single contiguous byte array every layer of a
//! [`Packet`](crate::Packet) points into. Its size only changes through
//! [`RawBuffer::insert`] and [`RawBuffer::remove`].

use bytes::Bytes;

use crate::error::{Error, Result};

/// Link-layer header types (pcap LINKTYPE values) understood by the parser.
pub mod link_type {
    /// Ethernet II frames.
    pub const ETHERNET: u16 = 1;
    /// Raw IP, version taken from the first nibble.
    pub const RAW: u16 = 101;
    /// Raw IPv4.
    pub const IPV4: u16 = 228;
    /// Raw IPv6.
    pub const IPV6: u16 = 229;
}

/// Contiguous, growable packet bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBuffer {
    data: Vec<u8>,
}

impl RawBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Insert `bytes` at `offset`, moving everything from `offset` onward
    /// towards the end.
    ///
    /// `offset == len()` appends.
    pub fn insert(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::OutOfRange {
                offset,
                count: bytes.len(),
                len: self.data.len(),
            });
        }
        self.data.splice(offset..offset, bytes.iter().copied());
        Ok(())
    }

    /// Remove `count` bytes starting at `offset`, moving the tail down.
    pub fn remove(&mut self, offset: usize, count: usize) -> Result<()> {
        let end = offset.checked_add(count).ok_or(Error::OutOfRange {
            offset,
            count,
            len: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(Error::OutOfRange {
                offset,
                count,
                len: self.data.len(),
            });
        }
        self.data.drain(offset..end);
        Ok(())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Hand the bytes off as an immutable, cheaply clonable buffer.
    pub fn freeze(self) -> Bytes {
        Bytes::from(self.data)
    }
}

impl From<Vec<u8>> for RawBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for RawBuffer {
    fn from(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }
}

impl From<Bytes> for RawBuffer {
    fn from(data: Bytes) -> Self {
        Self {
            data: Vec::from(data),
        }
    }
}

impl AsRef<[u8]> for RawBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// A captured frame: bytes plus the capture metadata that travels with them.
///
/// The timestamp is carried through untouched; the link type selects the
/// first layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    data: RawBuffer,
    /// pcap LINKTYPE of the first header.
    pub link_type: u16,
    /// Capture time in microseconds since the Unix epoch.
    pub timestamp_us: i64,
}

impl RawPacket {
    pub fn new(data: impl Into<RawBuffer>, link_type: u16, timestamp_us: i64) -> Self {
        Self {
            data: data.into(),
            link_type,
            timestamp_us,
        }
    }

    /// Ethernet frame with no capture time.
    pub fn ethernet(data: impl Into<RawBuffer>) -> Self {
        Self::new(data, link_type::ETHERNET, 0)
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    pub fn buffer(&self) -> &RawBuffer {
        &self.data
    }

    #[inline]
    pub(crate) fn buffer_mut(&mut self) -> &mut RawBuffer {
        &mut self.data
    }

    pub fn into_buffer(self) -> RawBuffer {
        self.data
    }
}
