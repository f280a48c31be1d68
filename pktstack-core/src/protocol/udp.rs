//! UDP layer.

use etherparse::UdpHeaderSlice;

use super::checksum::transport_checksum;
use super::gtp::GtpV1Protocol;
use super::ipv6::next_header;
use super::{
    read_u16, write_u16, ComputeContext, OsiModelLayer, Protocol, ProtocolError, ProtocolType,
};
use crate::layer::{layer_view, DetachedLayer};

/// IP protocol number for UDP.
pub const IP_PROTO_UDP: u8 = next_header::UDP;

/// UDP header length.
pub const UDP_HEADER_LEN: usize = 8;

/// UDP protocol.
#[derive(Debug, Clone, Copy)]
pub struct UdpProtocol;

impl Protocol for UdpProtocol {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::Udp
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::Transport
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        UdpHeaderSlice::from_slice(data)
            .map(|_| UDP_HEADER_LEN)
            .map_err(|_| ProtocolError::too_short("udp", UDP_HEADER_LEN, data.len()))
    }

    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType> {
        let udp = UdpHeaderSlice::from_slice(data).ok()?;
        let payload = &data[header_len..];
        let gtp_port = GtpV1Protocol::is_gtp_port(udp.source_port())
            || GtpV1Protocol::is_gtp_port(udp.destination_port());
        (gtp_port && GtpV1Protocol::is_gtp_v1(payload)).then_some(ProtocolType::GtpV1)
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        let length = u16::try_from(cx.data.len()).unwrap_or(u16::MAX);
        write_u16(cx.data, 4, length);

        let Some(prev) = cx.prev else {
            return;
        };
        // Over IPv4 a zero checksum means the sender did not compute one.
        if prev.kind == ProtocolType::Ipv4 && read_u16(cx.data, 6) == 0 {
            return;
        }
        write_u16(cx.data, 6, 0);
        if let Some(checksum) = transport_checksum(&prev, IP_PROTO_UDP, cx.data) {
            write_u16(cx.data, 6, checksum);
        }
    }

    fn summary(&self, data: &[u8]) -> String {
        match UdpHeaderSlice::from_slice(data) {
            Ok(udp) => format!(
                "UDP Layer, Src port: {}, Dst port: {}",
                udp.source_port(),
                udp.destination_port()
            ),
            Err(_) => "UDP Layer".to_string(),
        }
    }
}

layer_view!(
    /// UDP view.
    UdpLayer,
    ProtocolType::Udp
);

impl<P: std::ops::Deref<Target = crate::Packet>> UdpLayer<P> {
    pub fn source_port(&self) -> u16 {
        read_u16(self.bytes(), 0)
    }

    pub fn destination_port(&self) -> u16 {
        read_u16(self.bytes(), 2)
    }

    pub fn length(&self) -> u16 {
        read_u16(self.bytes(), 4)
    }

    pub fn checksum(&self) -> u16 {
        read_u16(self.bytes(), 6)
    }
}

impl<P: std::ops::DerefMut<Target = crate::Packet>> UdpLayer<P> {
    pub fn set_source_port(&mut self, port: u16) {
        write_u16(self.bytes_mut(), 0, port);
    }

    pub fn set_destination_port(&mut self, port: u16) {
        write_u16(self.bytes_mut(), 2, port);
    }
}

impl UdpLayer<&crate::Packet> {
    /// Header with length and checksum left to calculated fields.
    ///
    /// The checksum field is pre-set to `0xffff` so it is computed rather
    /// than treated as disabled.
    pub fn build(source_port: u16, destination_port: u16) -> DetachedLayer {
        let mut bytes = vec![0u8; UDP_HEADER_LEN];
        write_u16(&mut bytes, 0, source_port);
        write_u16(&mut bytes, 2, destination_port);
        write_u16(&mut bytes, 6, 0xffff);
        DetachedLayer::new(ProtocolType::Udp, bytes)
    }
}
