//! GTPv1 extension header records.
//!
//! Each record is `[length in 4-byte units][content][next extension type]`.
//! The record's own type is advertised by the byte before it: the last byte
//! of the optional region for the first record, the last byte of the
//! previous record otherwise.

use std::fmt;

use super::gtp::{extension_header_type, extension_header_type_name};

/// Offset of the first record in a GTPv1 header.
const FIRST_RECORD: usize = 12;
/// Offset of the next-extension byte in the optional region.
const FIRST_LINK: usize = 11;

/// Walk the extension chain of a GTPv1 header starting at byte 0.
///
/// Returns the offset just past the last well-formed record and the offset
/// of the next-type byte that ends the chain. The walk stops at a zero type,
/// a zero length, or a record running past `data`.
pub(crate) fn extension_chain_end(data: &[u8]) -> (usize, usize) {
    let mut record = FIRST_RECORD;
    let mut link = FIRST_LINK;
    while data.get(link).is_some_and(|&t| t != extension_header_type::NO_MORE) {
        let Some(total) = data.get(record).map(|&len| usize::from(len) * 4) else {
            break;
        };
        if total == 0 || record + total > data.len() {
            break;
        }
        link = record + total - 1;
        record += total;
    }
    (record.min(data.len()), link)
}

/// Cursor onto one extension record.
///
/// Borrows the header bytes from the record start to the end of the GTPv1
/// header, so it can step to the records that follow.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GtpExtension<'a> {
    data: &'a [u8],
    extension_type: u8,
}

impl<'a> GtpExtension<'a> {
    /// Cursor at the start of `data`, or `None` if the record length is zero
    /// or runs past `data`.
    pub(crate) fn new(data: &'a [u8], extension_type: u8) -> Option<Self> {
        let total = usize::from(*data.first()?) * 4;
        (total != 0 && total <= data.len()).then_some(Self {
            data,
            extension_type,
        })
    }

    /// Cursor on a record just written by the layer.
    pub(crate) fn from_record(data: &'a [u8], extension_type: u8) -> Self {
        Self {
            data,
            extension_type,
        }
    }

    pub fn extension_type(&self) -> u8 {
        self.extension_type
    }

    pub fn type_name(&self) -> &'static str {
        extension_header_type_name(self.extension_type)
    }

    /// Record length in bytes, length and next-type bytes included.
    pub fn total_len(&self) -> usize {
        usize::from(self.data[0]) * 4
    }

    pub fn content_len(&self) -> usize {
        self.total_len() - 2
    }

    pub fn content(&self) -> &'a [u8] {
        &self.data[1..self.total_len() - 1]
    }

    /// Whole record as it appears on the wire.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.data[..self.total_len()]
    }

    /// Type of the following record; 0 when this one ends the chain.
    pub fn next_extension_header_type(&self) -> u8 {
        self.data[self.total_len() - 1]
    }

    pub fn next_extension(&self) -> Option<GtpExtension<'a>> {
        let next_type = self.next_extension_header_type();
        if next_type == extension_header_type::NO_MORE {
            return None;
        }
        GtpExtension::new(&self.data[self.total_len()..], next_type)
    }
}

impl fmt::Debug for GtpExtension<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GtpExtension")
            .field("type", &format_args!("{:#04x}", self.extension_type))
            .field("total_len", &self.total_len())
            .field("content", &self.content())
            .field("next", &self.next_extension_header_type())
            .finish()
    }
}

/// Iterator over an extension chain.
#[derive(Debug, Clone)]
pub struct GtpExtensions<'a> {
    next: Option<GtpExtension<'a>>,
}

impl<'a> GtpExtensions<'a> {
    pub(crate) fn new(first: Option<GtpExtension<'a>>) -> Self {
        Self { next: first }
    }
}

impl<'a> Iterator for GtpExtensions<'a> {
    type Item = GtpExtension<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.next_extension();
        Some(current)
    }
}
