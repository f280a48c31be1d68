//! Ethernet II layer.

use etherparse::Ethernet2HeaderSlice;

use super::{
    read_u16, write_u16, ComputeContext, OsiModelLayer, Protocol, ProtocolError, ProtocolType,
};
use crate::layer::{layer_view, DetachedLayer};

/// Ethernet II header length.
pub const ETH_HEADER_LEN: usize = 14;

/// EtherType values the layer stack recognizes.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
}

/// Ethernet II protocol.
#[derive(Debug, Clone, Copy)]
pub struct EthernetProtocol;

impl Protocol for EthernetProtocol {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet II"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::Ethernet
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::DataLink
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        Ethernet2HeaderSlice::from_slice(data)
            .map(|eth| eth.slice().len())
            .map_err(|_| ProtocolError::too_short("ethernet", ETH_HEADER_LEN, data.len()))
    }

    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType> {
        let payload = data.get(header_len..)?;
        let version = payload.first()? >> 4;
        match read_u16(data, 12) {
            ethertype::IPV4 if version == 4 => Some(ProtocolType::Ipv4),
            ethertype::IPV6 if version == 6 => Some(ProtocolType::Ipv6),
            _ => None,
        }
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        let ether_type = match cx.next {
            Some(ProtocolType::Ipv4) => ethertype::IPV4,
            Some(ProtocolType::Ipv6) => ethertype::IPV6,
            _ => return,
        };
        write_u16(cx.data, 12, ether_type);
    }

    fn summary(&self, data: &[u8]) -> String {
        match Ethernet2HeaderSlice::from_slice(data) {
            Ok(eth) => format!(
                "Ethernet II Layer, Src: {}, Dst: {}",
                format_mac(&eth.source()),
                format_mac(&eth.destination())
            ),
            Err(_) => "Ethernet II Layer".to_string(),
        }
    }
}

fn format_mac(mac: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

layer_view!(
    /// Ethernet II view.
    EthLayer,
    ProtocolType::Ethernet
);

impl<P: std::ops::Deref<Target = crate::Packet>> EthLayer<P> {
    pub fn source(&self) -> [u8; 6] {
        mac_at(self.bytes(), 6)
    }

    pub fn destination(&self) -> [u8; 6] {
        mac_at(self.bytes(), 0)
    }

    pub fn ether_type(&self) -> u16 {
        read_u16(self.bytes(), 12)
    }
}

impl<P: std::ops::DerefMut<Target = crate::Packet>> EthLayer<P> {
    pub fn set_source(&mut self, mac: [u8; 6]) {
        self.bytes_mut()[6..12].copy_from_slice(&mac);
    }

    pub fn set_destination(&mut self, mac: [u8; 6]) {
        self.bytes_mut()[0..6].copy_from_slice(&mac);
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        write_u16(self.bytes_mut(), 12, ether_type);
    }
}

impl EthLayer<&crate::Packet> {
    /// Header with the EtherType left for [`Packet::compute_calculated_fields`](crate::Packet::compute_calculated_fields).
    pub fn build(source: [u8; 6], destination: [u8; 6]) -> DetachedLayer {
        let mut bytes = Vec::with_capacity(ETH_HEADER_LEN);
        bytes.extend_from_slice(&destination);
        bytes.extend_from_slice(&source);
        bytes.extend_from_slice(&[0, 0]);
        DetachedLayer::new(ProtocolType::Ethernet, bytes)
    }
}

fn mac_at(data: &[u8], at: usize) -> [u8; 6] {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[at..at + 6]);
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ether_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // dst mac
            0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, // src mac
        ];
        data.extend_from_slice(&ether_type.to_be_bytes());
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_header_len() {
        assert_eq!(EthernetProtocol.header_len(&frame(0x0800, &[])), Ok(14));
        assert!(EthernetProtocol.header_len(&[0u8; 13]).is_err());
    }

    #[test]
    fn test_next_layer_by_ethertype_and_version() {
        assert_eq!(
            EthernetProtocol.next_layer(&frame(ethertype::IPV4, &[0x45]), 14),
            Some(ProtocolType::Ipv4)
        );
        assert_eq!(
            EthernetProtocol.next_layer(&frame(ethertype::IPV6, &[0x60]), 14),
            Some(ProtocolType::Ipv6)
        );
        // EtherType says IPv4 but the payload is not.
        assert_eq!(
            EthernetProtocol.next_layer(&frame(ethertype::IPV4, &[0x60]), 14),
            None
        );
        assert_eq!(
            EthernetProtocol.next_layer(&frame(ethertype::ARP, &[0x00]), 14),
            None
        );
        assert_eq!(EthernetProtocol.next_layer(&frame(ethertype::IPV4, &[]), 14), None);
    }

    #[test]
    fn test_compute_sets_ethertype_from_next_layer() {
        let mut data = frame(0, &[0x60]);
        EthernetProtocol.compute_fields(ComputeContext {
            data: &mut data,
            header_len: 14,
            prev: None,
            next: Some(ProtocolType::Ipv6),
        });
        assert_eq!(read_u16(&data, 12), ethertype::IPV6);
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            EthernetProtocol.summary(&frame(ethertype::IPV4, &[])),
            "Ethernet II Layer, Src: 66:77:88:99:aa:bb, Dst: 00:11:22:33:44:55"
        );
    }

    #[test]
    fn test_build_and_accessors() {
        let mut packet = crate::Packet::empty(crate::buffer::link_type::ETHERNET);
        packet
            .add_layer(EthLayer::build([0x02; 6], [0xff; 6]))
            .unwrap();
        {
            let mut eth = packet.layer_of_type_mut::<EthLayer<_>>().unwrap();
            eth.set_ether_type(ethertype::ARP);
        }
        let eth = packet.layer_of_type::<EthLayer<_>>().unwrap();
        assert_eq!(eth.source(), [0x02; 6]);
        assert_eq!(eth.destination(), [0xff; 6]);
        assert_eq!(eth.ether_type(), ethertype::ARP);
    }
}
