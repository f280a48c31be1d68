//! Link-layer padding after the outermost IP datagram.

use super::{ComputeContext, OsiModelLayer, Protocol, ProtocolError, ProtocolType};

/// Packet trailer protocol.
///
/// Covers every byte after the length the outermost IP header declares.
#[derive(Debug, Clone, Copy)]
pub struct TrailerProtocol;

impl Protocol for TrailerProtocol {
    fn name(&self) -> &'static str {
        "trailer"
    }

    fn display_name(&self) -> &'static str {
        "Packet Trailer"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::PacketTrailer
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::DataLink
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        Ok(data.len())
    }

    fn next_layer(&self, _data: &[u8], _header_len: usize) -> Option<ProtocolType> {
        None
    }

    fn compute_fields(&self, _cx: ComputeContext<'_>) {}

    fn summary(&self, data: &[u8]) -> String {
        format!("Packet Trailer, Len: {}", data.len())
    }
}
