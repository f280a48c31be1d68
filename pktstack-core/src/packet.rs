//! The layer stack over one frame.
//!
//! [`Packet`] owns a [`RawPacket`] and an ordered list of layer descriptors.
//! Layer *i* covers the bytes from its own offset up to the offset of layer
//! *i + 1*; the last layer runs to the end of the buffer. Every change in
//! buffer size shifts the descriptors behind the mutation point in the same
//! step, so offsets never go stale.

use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::buffer::{link_type, RawBuffer, RawPacket};
use crate::error::{Error, Result};
use crate::layer::{DetachedLayer, Layer, LayerRef, LayerSlot, TypedLayer};
use crate::options::ParseOptions;
use crate::protocol::{BuiltinProtocol, ComputeContext, PrevLayer, Protocol, ProtocolType};

/// Typical frames have 3-6 layers; a tunnel adds 2-3 more.
type LayerList = SmallVec<[LayerSlot; 8]>;

/// A parsed frame whose layers can be read, edited, added and removed.
#[derive(Debug, Clone)]
pub struct Packet {
    raw: RawPacket,
    layers: LayerList,
    /// Bumped on every change to the layer list or buffer size.
    generation: u64,
}

impl Default for Packet {
    fn default() -> Self {
        Self::empty(link_type::ETHERNET)
    }
}

impl Packet {
    /// Parse `raw` with default options.
    pub fn new(raw: RawPacket) -> Self {
        Self::with_options(raw, ParseOptions::default())
    }

    pub fn with_options(raw: RawPacket, options: ParseOptions) -> Self {
        let layers = parse_layers(raw.data(), raw.link_type, &options);
        Self {
            raw,
            layers,
            generation: 0,
        }
    }

    /// Parse an Ethernet frame.
    pub fn from_bytes(data: impl Into<RawBuffer>) -> Self {
        Self::new(RawPacket::ethernet(data))
    }

    /// A packet with no bytes, to be built with [`Packet::add_layer`].
    pub fn empty(link_type: u16) -> Self {
        Self {
            raw: RawPacket::new(RawBuffer::new(), link_type, 0),
            layers: LayerList::new(),
            generation: 0,
        }
    }

    pub fn raw(&self) -> &RawPacket {
        &self.raw
    }

    pub fn into_raw(self) -> RawPacket {
        self.raw
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.data()
    }

    #[inline]
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.raw.buffer_mut().as_mut_slice()
    }

    pub fn len(&self) -> usize {
        self.raw.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.data().is_empty()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> impl Iterator<Item = Layer<'_>> + '_ {
        (0..self.layers.len()).map(move |index| Layer::new(self, index))
    }

    pub fn first_layer(&self) -> Option<Layer<'_>> {
        self.layer_at(0)
    }

    pub fn last_layer(&self) -> Option<Layer<'_>> {
        self.layers.len().checked_sub(1).and_then(|i| self.layer_at(i))
    }

    pub fn layer_at(&self, index: usize) -> Option<Layer<'_>> {
        (index < self.layers.len()).then(|| Layer::new(self, index))
    }

    /// Resolve a handle taken earlier.
    pub fn layer(&self, layer: LayerRef) -> Result<Layer<'_>> {
        self.check_ref(layer)?;
        Ok(Layer::new(self, layer.index))
    }

    /// First layer of type `L`.
    pub fn layer_of_type<'a, L: TypedLayer<&'a Packet>>(&'a self) -> Option<L> {
        let index = self.position_of(L::PROTOCOL, 0)?;
        Some(L::from_packet(self, index))
    }

    /// First layer of type `L`, writable.
    pub fn layer_of_type_mut<'a, L: TypedLayer<&'a mut Packet>>(&'a mut self) -> Option<L> {
        let index = self.position_of(L::PROTOCOL, 0)?;
        Some(L::from_packet(self, index))
    }

    /// First layer of type `L` strictly after `after`.
    pub fn next_layer_of_type<'a, L: TypedLayer<&'a Packet>>(
        &'a self,
        after: LayerRef,
    ) -> Result<Option<L>> {
        self.check_ref(after)?;
        Ok(self
            .position_of(L::PROTOCOL, after.index + 1)
            .map(|index| L::from_packet(self, index)))
    }

    /// Writable typed view of a handle; `None` if the layer is of another kind.
    pub fn layer_mut<'a, L: TypedLayer<&'a mut Packet>>(
        &'a mut self,
        layer: LayerRef,
    ) -> Result<Option<L>> {
        self.check_ref(layer)?;
        if layer.kind != L::PROTOCOL {
            return Ok(None);
        }
        Ok(Some(L::from_packet(self, layer.index)))
    }

    /// Whether any layer matches `kind`, categories included.
    pub fn is_packet_of_type(&self, kind: ProtocolType) -> bool {
        self.layers().any(|layer| layer.is_of_type(kind))
    }

    /// Append a layer at the end of the payload, before a packet trailer if
    /// there is one.
    pub fn add_layer(&mut self, layer: DetachedLayer) -> Result<LayerRef> {
        let index = match self.layers.last() {
            Some(slot) if slot.kind() == ProtocolType::PacketTrailer => self.layers.len() - 1,
            _ => self.layers.len(),
        };
        let at = self.payload_end();
        self.attach(index, at, layer)
    }

    /// Insert a layer right after the header of `after`, or at the very
    /// start of the packet when `after` is `None`.
    pub fn insert_layer(
        &mut self,
        after: Option<LayerRef>,
        layer: DetachedLayer,
    ) -> Result<LayerRef> {
        let (index, at) = match after {
            None => (0, 0),
            Some(prev) => {
                self.check_ref(prev)?;
                if prev.kind == ProtocolType::PacketTrailer {
                    warn!("refusing to insert a layer after the packet trailer");
                    return Err(Error::LayerConflict {
                        reason: "no layer can follow the packet trailer",
                    });
                }
                let slot = self.slot(prev.index);
                (prev.index + 1, slot.offset + self.header_len_at(prev.index))
            }
        };
        self.attach(index, at, layer)
    }

    /// Remove a layer and all bytes it covers.
    pub fn remove_layer(&mut self, layer: LayerRef) -> Result<()> {
        self.check_ref(layer)?;
        let region = self.region(layer.index);
        let count = region.end - region.start;
        self.raw.buffer_mut().remove(region.start, count)?;
        self.layers.remove(layer.index);
        for slot in self.layers.iter_mut().skip(layer.index) {
            slot.offset -= count;
        }
        self.generation += 1;
        trace!(kind = %layer.kind, offset = region.start, count, "layer removed");
        Ok(())
    }

    /// Recompute lengths, next-protocol fields and checksums, innermost
    /// layer first.
    pub fn compute_calculated_fields(&mut self) {
        let end = self.payload_end();
        for index in (0..self.layers.len()).rev() {
            let slot = self.layers[index];
            if slot.kind() == ProtocolType::PacketTrailer {
                continue;
            }
            let header_len = self.header_len_at(index);
            let next = self
                .layers
                .get(index + 1)
                .map(LayerSlot::kind)
                .filter(|kind| *kind != ProtocolType::PacketTrailer);
            let prev_slot = index.checked_sub(1).map(|i| self.layers[i]);

            let buf = self.raw.buffer_mut().as_mut_slice();
            let (before, rest) = buf.split_at_mut(slot.offset);
            let prev = prev_slot.map(|p| PrevLayer {
                kind: p.kind(),
                data: &before[p.offset..],
            });
            trace!(protocol = slot.protocol.name(), offset = slot.offset, "computing fields");
            slot.protocol.compute_fields(ComputeContext {
                data: &mut rest[..end - slot.offset],
                header_len,
                prev,
                next,
            });
        }
    }

    /// Insert `bytes` at absolute offset `at` on behalf of layer `owner`.
    ///
    /// Every other layer starting at or after `at` moves up by `bytes.len()`.
    pub(crate) fn grow_layer(&mut self, owner: usize, at: usize, bytes: &[u8]) -> Result<()> {
        if let Err(err) = self.raw.buffer_mut().insert(at, bytes) {
            warn!(%err, "layer growth rejected");
            return Err(err);
        }
        for (index, slot) in self.layers.iter_mut().enumerate() {
            if index != owner && slot.offset >= at {
                slot.offset += bytes.len();
            }
        }
        self.generation += 1;
        Ok(())
    }

    /// Remove `count` bytes at absolute offset `at` from layer `owner`.
    ///
    /// Every other layer starting at or after `at + count` moves down.
    pub(crate) fn shrink_layer(&mut self, owner: usize, at: usize, count: usize) -> Result<()> {
        if let Err(err) = self.raw.buffer_mut().remove(at, count) {
            warn!(%err, "layer shrink rejected");
            return Err(err);
        }
        for (index, slot) in self.layers.iter_mut().enumerate() {
            if index != owner && slot.offset >= at + count {
                slot.offset -= count;
            }
        }
        self.generation += 1;
        Ok(())
    }

    fn attach(&mut self, index: usize, at: usize, layer: DetachedLayer) -> Result<LayerRef> {
        let protocol = attachable(&layer)?;
        self.raw.buffer_mut().insert(at, layer.as_bytes())?;
        for slot in self.layers.iter_mut().skip(index) {
            slot.offset += layer.as_bytes().len();
        }
        self.layers.insert(index, LayerSlot { protocol, offset: at });
        self.generation += 1;
        trace!(kind = %layer.kind(), index, offset = at, "layer attached");
        Ok(self.make_ref(index))
    }

    fn check_ref(&self, layer: LayerRef) -> Result<()> {
        let current = layer.generation == self.generation
            && self
                .layers
                .get(layer.index)
                .is_some_and(|slot| slot.kind() == layer.kind);
        if current {
            Ok(())
        } else {
            warn!(index = layer.index, kind = %layer.kind, "stale layer handle");
            Err(Error::LayerConflict {
                reason: "layer handle invalidated by a later mutation",
            })
        }
    }

    fn position_of(&self, kind: ProtocolType, from: usize) -> Option<usize> {
        self.layers
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, slot)| slot.kind() == kind)
            .map(|(index, _)| index)
    }

    pub(crate) fn slot(&self, index: usize) -> LayerSlot {
        self.layers[index]
    }

    pub(crate) fn make_ref(&self, index: usize) -> LayerRef {
        LayerRef {
            index,
            generation: self.generation,
            kind: self.layers[index].kind(),
        }
    }

    /// End of the bytes that belong to parsed layers: the packet trailer's
    /// offset, or the buffer length.
    fn payload_end(&self) -> usize {
        match self.layers.last() {
            Some(slot) if slot.kind() == ProtocolType::PacketTrailer => slot.offset,
            _ => self.len(),
        }
    }

    /// Bytes owned by the layer: up to the next layer's start.
    pub(crate) fn region(&self, index: usize) -> Range<usize> {
        let start = self.layers[index].offset;
        let end = self
            .layers
            .get(index + 1)
            .map_or(self.len(), |next| next.offset);
        start..end
    }

    /// Bytes the layer's protocol gets to see: up to the payload end.
    pub(crate) fn window(&self, index: usize) -> Range<usize> {
        let slot = self.layers[index];
        if slot.kind() == ProtocolType::PacketTrailer {
            return self.region(index);
        }
        slot.offset..self.payload_end().max(slot.offset)
    }

    pub(crate) fn header_len_at(&self, index: usize) -> usize {
        let region = self.region(index);
        let region_len = region.end - region.start;
        let window = self.window(index);
        self.layers[index]
            .protocol
            .header_len(&self.as_bytes()[window])
            .unwrap_or(region_len)
            .min(region_len)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, layer) in self.layers().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&layer.summary())?;
        }
        Ok(())
    }
}

/// Validate a detached layer before any byte of the packet changes.
fn attachable(layer: &DetachedLayer) -> Result<BuiltinProtocol> {
    let protocol = match BuiltinProtocol::for_kind(layer.kind()) {
        Some(protocol) if layer.kind() != ProtocolType::PacketTrailer => protocol,
        _ => {
            warn!(kind = %layer.kind(), "layer kind cannot be attached");
            return Err(Error::LayerConflict {
                reason: "only concrete protocol layers can be attached",
            });
        }
    };
    protocol.header_len(layer.as_bytes())?;
    Ok(protocol)
}

fn first_layer_kind(link_type: u16, data: &[u8]) -> Option<ProtocolType> {
    match link_type {
        link_type::ETHERNET => Some(ProtocolType::Ethernet),
        link_type::IPV4 => Some(ProtocolType::Ipv4),
        link_type::IPV6 => Some(ProtocolType::Ipv6),
        link_type::RAW => match data.first()? >> 4 {
            4 => Some(ProtocolType::Ipv4),
            6 => Some(ProtocolType::Ipv6),
            _ => None,
        },
        _ => None,
    }
}

/// Walk the frame top-down.
///
/// Stops at an unrecognized protocol, a header that does not parse, the end
/// of the data, or whatever `options` ask for. Never fails.
fn parse_layers(data: &[u8], link_type: u16, options: &ParseOptions) -> LayerList {
    let mut layers = LayerList::new();
    let mut limit = data.len();
    let mut offset = 0;
    let mut next = first_layer_kind(link_type, data);
    let mut outer_datagram = true;

    while let Some(kind) = next {
        if offset >= limit || layers.len() >= options.max_layers {
            break;
        }
        let Some(protocol) = BuiltinProtocol::for_kind(kind) else {
            break;
        };
        let bytes = &data[offset..limit];
        let header_len = match protocol.header_len(bytes) {
            Ok(len) => len,
            Err(err) => {
                debug!(%err, offset, "stopping layer chain at malformed header");
                break;
            }
        };
        trace!(protocol = protocol.name(), offset, header_len, "layer identified");
        layers.push(LayerSlot { protocol, offset });

        // Only the outermost datagram can be followed by link-layer padding.
        if outer_datagram {
            if let Some(declared) = protocol.declared_len(bytes) {
                outer_datagram = false;
                if declared >= header_len && declared < bytes.len() {
                    limit = offset + declared;
                    debug!(offset = limit, len = data.len() - limit, "padding trailer detected");
                }
            }
        }

        if options.stops_after(kind, protocol.osi_layer()) {
            break;
        }
        next = protocol.next_layer(&bytes[..limit - offset], header_len);
        offset += header_len;
    }

    if limit < data.len() {
        layers.push(LayerSlot {
            protocol: BuiltinProtocol::Trailer(crate::protocol::TrailerProtocol),
            offset: limit,
        });
    }
    layers
}
