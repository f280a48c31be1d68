//! TCP layer.

use etherparse::TcpHeaderSlice;

use super::checksum::transport_checksum;
use super::ipv6::next_header;
use super::{
    read_u16, read_u32, write_u16, ComputeContext, OsiModelLayer, Protocol, ProtocolError,
    ProtocolType,
};
use crate::layer::layer_view;

/// IP protocol number for TCP.
pub const IP_PROTO_TCP: u8 = next_header::TCP;

/// TCP protocol.
#[derive(Debug, Clone, Copy)]
pub struct TcpProtocol;

impl Protocol for TcpProtocol {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::Tcp
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::Transport
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        TcpHeaderSlice::from_slice(data)
            .map(|tcp| tcp.slice().len())
            .map_err(|e| ProtocolError::InvalidField {
                protocol: "tcp",
                field: "header",
                reason: e.to_string(),
            })
    }

    fn next_layer(&self, _data: &[u8], _header_len: usize) -> Option<ProtocolType> {
        None
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        let Some(prev) = cx.prev else {
            return;
        };
        write_u16(cx.data, 16, 0);
        if let Some(checksum) = transport_checksum(&prev, IP_PROTO_TCP, cx.data) {
            write_u16(cx.data, 16, checksum);
        }
    }

    fn summary(&self, data: &[u8]) -> String {
        let Ok(tcp) = TcpHeaderSlice::from_slice(data) else {
            return "TCP Layer".to_string();
        };
        let flags: Vec<&str> = [
            (tcp.syn(), "SYN"),
            (tcp.ack(), "ACK"),
            (tcp.fin(), "FIN"),
            (tcp.rst(), "RST"),
            (tcp.psh(), "PSH"),
            (tcp.urg(), "URG"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
        format!(
            "TCP Layer, [{}], Src port: {}, Dst port: {}",
            flags.join(", "),
            tcp.source_port(),
            tcp.destination_port()
        )
    }
}

layer_view!(
    /// TCP view.
    TcpLayer,
    ProtocolType::Tcp
);

impl<P: std::ops::Deref<Target = crate::Packet>> TcpLayer<P> {
    pub fn source_port(&self) -> u16 {
        read_u16(self.bytes(), 0)
    }

    pub fn destination_port(&self) -> u16 {
        read_u16(self.bytes(), 2)
    }

    pub fn sequence_number(&self) -> u32 {
        read_u32(self.bytes(), 4)
    }

    pub fn acknowledgment_number(&self) -> u32 {
        read_u32(self.bytes(), 8)
    }

    /// Flag bits of byte 13 (CWR .. FIN).
    pub fn flags(&self) -> u8 {
        self.bytes()[13]
    }

    pub fn checksum(&self) -> u16 {
        read_u16(self.bytes(), 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PrevLayer;

    fn syn_header() -> Vec<u8> {
        vec![
            0xc3, 0x50, 0x00, 0x50, // ports 50000 -> 80
            0x00, 0x00, 0x00, 0x01, // seq
            0x00, 0x00, 0x00, 0x00, // ack
            0x50, 0x02, 0xff, 0xff, // data offset 5, SYN, window
            0x00, 0x00, 0x00, 0x00, // checksum, urgent
        ]
    }

    #[test]
    fn test_header_len_from_data_offset() {
        assert_eq!(TcpProtocol.header_len(&syn_header()), Ok(20));

        let mut data = syn_header();
        data[12] = 0x60;
        assert!(TcpProtocol.header_len(&data).is_err());
        data.extend_from_slice(&[1, 1, 1, 0]);
        assert_eq!(TcpProtocol.header_len(&data), Ok(24));
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            TcpProtocol.summary(&syn_header()),
            "TCP Layer, [SYN], Src port: 50000, Dst port: 80"
        );
    }

    #[test]
    fn test_checksum_verifies() {
        let ip = [
            0x45, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x40, 0x06, 0x00, 0x00, 0x0a, 0x00,
            0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
        ];
        let mut data = syn_header();
        TcpProtocol.compute_fields(ComputeContext {
            data: &mut data,
            header_len: 20,
            prev: Some(PrevLayer {
                kind: ProtocolType::Ipv4,
                data: &ip,
            }),
            next: None,
        });
        let verify = etherparse::checksum::Sum16BitWords::new()
            .add_slice(&ip[12..20])
            .add_2bytes([0, 6])
            .add_2bytes(20u16.to_be_bytes())
            .add_slice(&data)
            .ones_complement();
        assert_eq!(verify, 0);
    }
}
