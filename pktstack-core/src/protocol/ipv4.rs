//! IPv4 layer.
//!
//! Header fields are read at fixed offsets rather than through
//! `etherparse::Ipv4HeaderSlice`: a header under construction still has a
//! zero total length until calculated fields run, and the slice parser rejects
//! that.

use std::net::Ipv4Addr;

use super::checksum::internet_checksum;
use super::ipv6::next_header;
use super::{
    read_u16, write_u16, ComputeContext, OsiModelLayer, Protocol, ProtocolError, ProtocolType,
};
use crate::layer::{layer_view, DetachedLayer};

/// Minimum IPv4 header length (IHL 5).
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// IPv4 protocol.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Protocol;

impl Ipv4Protocol {
    fn is_fragment_tail(data: &[u8]) -> bool {
        read_u16(data, 6) & 0x1fff != 0
    }
}

/// IP protocol number for the kind that follows, if it has one.
pub(crate) fn ip_protocol_for(kind: ProtocolType) -> Option<u8> {
    match kind {
        ProtocolType::Icmp => Some(next_header::ICMP),
        ProtocolType::Tcp => Some(next_header::TCP),
        ProtocolType::Udp => Some(next_header::UDP),
        ProtocolType::Ipv4 => Some(next_header::IPIP),
        ProtocolType::Ipv6 => Some(next_header::IPV6_IN_IP),
        _ => None,
    }
}

/// Kind identified by an IP protocol number.
pub(crate) fn kind_for_ip_protocol(proto: u8) -> Option<ProtocolType> {
    match proto {
        next_header::ICMP => Some(ProtocolType::Icmp),
        next_header::TCP => Some(ProtocolType::Tcp),
        next_header::UDP => Some(ProtocolType::Udp),
        next_header::IPIP => Some(ProtocolType::Ipv4),
        next_header::IPV6_IN_IP => Some(ProtocolType::Ipv6),
        _ => None,
    }
}

impl Protocol for Ipv4Protocol {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::Ipv4
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::Network
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(ProtocolError::too_short("ipv4", IPV4_MIN_HEADER_LEN, data.len()));
        }
        let version = data[0] >> 4;
        if version != 4 {
            return Err(ProtocolError::InvalidField {
                protocol: "ipv4",
                field: "version",
                reason: format!("expected 4, found {version}"),
            });
        }
        let ihl = usize::from(data[0] & 0x0f) * 4;
        if ihl < IPV4_MIN_HEADER_LEN {
            return Err(ProtocolError::InvalidField {
                protocol: "ipv4",
                field: "ihl",
                reason: format!("{ihl} bytes is below the minimum header"),
            });
        }
        if ihl > data.len() {
            return Err(ProtocolError::too_short("ipv4", ihl, data.len()));
        }
        Ok(ihl)
    }

    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType> {
        if data.len() <= header_len || Self::is_fragment_tail(data) {
            return None;
        }
        kind_for_ip_protocol(data[9])
    }

    fn declared_len(&self, data: &[u8]) -> Option<usize> {
        Some(usize::from(read_u16(data, 2)))
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        let header_len = cx.header_len;
        let total_len = u16::try_from(cx.data.len()).unwrap_or(u16::MAX);
        write_u16(cx.data, 2, total_len);
        if let Some(proto) = cx.next.and_then(ip_protocol_for) {
            cx.data[9] = proto;
        }
        write_u16(cx.data, 10, 0);
        let checksum = internet_checksum(&cx.data[..header_len]);
        write_u16(cx.data, 10, checksum);
    }

    fn summary(&self, data: &[u8]) -> String {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return "IPv4 Layer".to_string();
        }
        format!(
            "IPv4 Layer, Src: {}, Dst: {}",
            addr_at(data, 12),
            addr_at(data, 16)
        )
    }
}

fn addr_at(data: &[u8], at: usize) -> Ipv4Addr {
    Ipv4Addr::new(data[at], data[at + 1], data[at + 2], data[at + 3])
}

layer_view!(
    /// IPv4 view.
    Ipv4Layer,
    ProtocolType::Ipv4
);

impl<P: std::ops::Deref<Target = crate::Packet>> Ipv4Layer<P> {
    pub fn source(&self) -> Ipv4Addr {
        addr_at(self.bytes(), 12)
    }

    pub fn destination(&self) -> Ipv4Addr {
        addr_at(self.bytes(), 16)
    }

    pub fn total_len(&self) -> u16 {
        read_u16(self.bytes(), 2)
    }

    pub fn identification(&self) -> u16 {
        read_u16(self.bytes(), 4)
    }

    pub fn ttl(&self) -> u8 {
        self.bytes()[8]
    }

    pub fn protocol(&self) -> u8 {
        self.bytes()[9]
    }

    pub fn header_checksum(&self) -> u16 {
        read_u16(self.bytes(), 10)
    }
}

impl<P: std::ops::DerefMut<Target = crate::Packet>> Ipv4Layer<P> {
    pub fn set_source(&mut self, addr: Ipv4Addr) {
        self.bytes_mut()[12..16].copy_from_slice(&addr.octets());
    }

    pub fn set_destination(&mut self, addr: Ipv4Addr) {
        self.bytes_mut()[16..20].copy_from_slice(&addr.octets());
    }

    pub fn set_identification(&mut self, id: u16) {
        write_u16(self.bytes_mut(), 4, id);
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.bytes_mut()[8] = ttl;
    }
}

impl Ipv4Layer<&crate::Packet> {
    /// 20-byte header without options; lengths, protocol and checksum are
    /// filled in by calculated fields.
    pub fn build(source: Ipv4Addr, destination: Ipv4Addr, ttl: u8) -> DetachedLayer {
        let mut bytes = vec![0u8; IPV4_MIN_HEADER_LEN];
        bytes[0] = 0x45;
        bytes[8] = ttl;
        bytes[12..16].copy_from_slice(&source.octets());
        bytes[16..20].copy_from_slice(&destination.octets());
        DetachedLayer::new(ProtocolType::Ipv4, bytes)
    }
}
