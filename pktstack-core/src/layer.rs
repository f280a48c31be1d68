//! Layer descriptors, handles and views.
//!
//! A packet stores one [`LayerSlot`] per layer: its kind and the offset of
//! its first byte in the shared buffer. Everything else (header length,
//! payload, field values) is recomputed from the bytes on demand.
//!
//! Consumers see layers through views that borrow the packet:
//!
//! - [`Layer`], an untyped read-only view
//! - typed views such as [`GtpV1Layer<P>`](crate::GtpV1Layer), generic over
//!   `P = &Packet` (read) or `P = &mut Packet` (read and write)
//!
//! Views cannot outlive a mutation. [`LayerRef`] is the copyable handle that
//! can; it is checked against the packet's generation when used.

use std::fmt;

use crate::packet::Packet;
use crate::protocol::{BuiltinProtocol, OsiModelLayer, Protocol, ProtocolType};

/// Descriptor stored by the packet for each layer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LayerSlot {
    pub protocol: BuiltinProtocol,
    pub offset: usize,
}

impl LayerSlot {
    #[inline]
    pub fn kind(&self) -> ProtocolType {
        self.protocol.kind()
    }
}

/// Copyable handle to a layer.
///
/// Valid until the packet's layer structure or buffer size next changes.
/// Using it afterwards yields [`Error::LayerConflict`](crate::Error::LayerConflict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerRef {
    pub(crate) index: usize,
    pub(crate) generation: u64,
    pub(crate) kind: ProtocolType,
}

impl LayerRef {
    /// Position in the layer chain, 0 being the outermost layer.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> ProtocolType {
        self.kind
    }
}

/// Implemented by typed layer views so packets can look them up by kind.
pub trait TypedLayer<P>: Sized {
    /// Concrete kind this view reads.
    const PROTOCOL: ProtocolType;

    #[doc(hidden)]
    fn from_packet(packet: P, index: usize) -> Self;
}

/// Untyped, read-only view of one layer.
#[derive(Clone, Copy)]
pub struct Layer<'p> {
    packet: &'p Packet,
    index: usize,
}

impl<'p> Layer<'p> {
    pub(crate) fn new(packet: &'p Packet, index: usize) -> Self {
        Self { packet, index }
    }

    pub fn kind(&self) -> ProtocolType {
        self.packet.slot(self.index).kind()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Offset of the layer's first byte in the packet buffer.
    pub fn offset(&self) -> usize {
        self.packet.slot(self.index).offset
    }

    pub fn header_len(&self) -> usize {
        self.packet.header_len_at(self.index)
    }

    /// Header followed by any bytes not claimed by the next layer.
    pub fn data(&self) -> &'p [u8] {
        &self.packet.as_bytes()[self.packet.region(self.index)]
    }

    pub fn header(&self) -> &'p [u8] {
        &self.data()[..self.header_len()]
    }

    /// Everything after the header up to the end of the packet payload.
    pub fn payload(&self) -> &'p [u8] {
        let window = self.packet.window(self.index);
        let start = window.start + self.header_len();
        &self.packet.as_bytes()[start..window.end]
    }

    pub fn osi_layer(&self) -> OsiModelLayer {
        self.protocol().osi_layer()
    }

    pub fn next_layer(&self) -> Option<Layer<'p>> {
        (self.index + 1 < self.packet.layer_count()).then(|| Layer::new(self.packet, self.index + 1))
    }

    pub fn prev_layer(&self) -> Option<Layer<'p>> {
        self.index
            .checked_sub(1)
            .map(|index| Layer::new(self.packet, index))
    }

    pub fn layer_ref(&self) -> LayerRef {
        self.packet.make_ref(self.index)
    }

    /// Hierarchical kind match.
    ///
    /// `Ip` matches IPv4 and IPv6, `Gtp` matches GTPv1, and `GtpU` / `GtpC`
    /// look at the GTPv1 message type.
    pub fn is_of_type(&self, kind: ProtocolType) -> bool {
        let own = self.kind();
        if !kind.contains(own) {
            return false;
        }
        match kind {
            ProtocolType::GtpU | ProtocolType::GtpC => {
                let is_user_plane = crate::protocol::GtpV1Protocol::is_user_plane(self.data());
                (kind == ProtocolType::GtpU) == is_user_plane
            }
            _ => true,
        }
    }

    /// Typed view of this layer if it is of kind `L::PROTOCOL`.
    pub fn downcast<L: TypedLayer<&'p Packet>>(self) -> Option<L> {
        (self.kind() == L::PROTOCOL).then(|| L::from_packet(self.packet, self.index))
    }

    /// Owned copy of the layer bytes, ready to be added to another packet.
    pub fn to_detached(&self) -> DetachedLayer {
        DetachedLayer::new(self.kind(), self.data().to_vec())
    }

    pub fn summary(&self) -> String {
        let window = self.packet.window(self.index);
        self.protocol().summary(&self.packet.as_bytes()[window])
    }

    fn protocol(&self) -> BuiltinProtocol {
        self.packet.slot(self.index).protocol
    }
}

impl fmt::Debug for Layer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("kind", &self.kind())
            .field("index", &self.index)
            .field("offset", &self.offset())
            .field("header_len", &self.header_len())
            .finish()
    }
}

impl fmt::Display for Layer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Layer bytes not yet attached to a packet.
///
/// Produced by the `build` constructors of the typed views or by
/// [`Layer::to_detached`], consumed by [`Packet::add_layer`] and
/// [`Packet::insert_layer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedLayer {
    kind: ProtocolType,
    bytes: Vec<u8>,
}

impl DetachedLayer {
    pub fn new(kind: ProtocolType, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    pub fn kind(&self) -> ProtocolType {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Declare a typed layer view.
///
/// Generates the struct, its [`TypedLayer`] impl, and the accessors every
/// view shares. The view-specific getters are written by hand next to the
/// protocol.
macro_rules! layer_view {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        pub struct $name<P> {
            packet: P,
            index: usize,
        }

        impl<P: std::ops::Deref<Target = $crate::Packet>> $crate::layer::TypedLayer<P> for $name<P> {
            const PROTOCOL: $crate::ProtocolType = $kind;

            fn from_packet(packet: P, index: usize) -> Self {
                Self { packet, index }
            }
        }

        #[allow(dead_code)]
        impl<P: std::ops::Deref<Target = $crate::Packet>> $name<P> {
            /// Untyped view of the same layer.
            pub fn as_layer(&self) -> $crate::Layer<'_> {
                $crate::Layer::new(&self.packet, self.index)
            }

            pub fn layer_ref(&self) -> $crate::LayerRef {
                self.packet.make_ref(self.index)
            }

            pub fn offset(&self) -> usize {
                self.packet.slot(self.index).offset
            }

            pub fn header_len(&self) -> usize {
                self.packet.header_len_at(self.index)
            }

            pub fn header_bytes(&self) -> &[u8] {
                let start = self.offset();
                &self.packet.as_bytes()[start..start + self.header_len()]
            }

            pub fn payload(&self) -> &[u8] {
                self.as_layer().payload()
            }

            pub fn next_layer(&self) -> Option<$crate::Layer<'_>> {
                self.as_layer().next_layer()
            }

            pub fn to_detached(&self) -> $crate::DetachedLayer {
                self.as_layer().to_detached()
            }

            /// Layer bytes up to the end of the packet payload.
            fn bytes(&self) -> &[u8] {
                let window = self.packet.window(self.index);
                &self.packet.as_bytes()[window]
            }
        }

        #[allow(dead_code)]
        impl<P: std::ops::DerefMut<Target = $crate::Packet>> $name<P> {
            fn bytes_mut(&mut self) -> &mut [u8] {
                let window = self.packet.window(self.index);
                &mut self.packet.as_bytes_mut()[window]
            }
        }

        impl<P: std::ops::Deref<Target = $crate::Packet>> std::fmt::Display for $name<P> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.as_layer().summary())
            }
        }

        impl<P: std::ops::Deref<Target = $crate::Packet>> std::fmt::Debug for $name<P> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("index", &self.index)
                    .field("offset", &self.offset())
                    .field("header_len", &self.header_len())
                    .finish()
            }
        }
    };
}

pub(crate) use layer_view;
