//! IPv6 layer with extension header support.

use std::net::Ipv6Addr;

use etherparse::Ipv6HeaderSlice;

use super::ipv4::{ip_protocol_for, kind_for_ip_protocol};
use super::{
    read_u16, write_u16, ComputeContext, OsiModelLayer, Protocol, ProtocolError, ProtocolType,
};
use crate::layer::{layer_view, DetachedLayer};

/// Fixed IPv6 header length.
pub const IPV6_HEADER_LEN: usize = 40;

/// Safety limit on chained extension headers.
const MAX_EXTENSION_HEADERS: usize = 8;

/// IP protocol / IPv6 Next Header values.
pub mod next_header {
    pub const HOP_BY_HOP: u8 = 0;
    pub const ICMP: u8 = 1;
    /// IPv4 encapsulated in IP (IP-in-IP)
    pub const IPIP: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    /// IPv6 encapsulated in IP
    pub const IPV6_IN_IP: u8 = 41;
    pub const ROUTING: u8 = 43;
    pub const FRAGMENT: u8 = 44;
    pub const AH: u8 = 51;
    pub const NO_NEXT_HEADER: u8 = 59;
    pub const DESTINATION: u8 = 60;
}

fn is_extension_header(nh: u8) -> bool {
    matches!(
        nh,
        next_header::HOP_BY_HOP
            | next_header::ROUTING
            | next_header::FRAGMENT
            | next_header::DESTINATION
            | next_header::AH
    )
}

/// Walk the extension header chain.
///
/// Returns the length of the fixed header plus extensions and the final
/// next-header value.
fn walk_extensions(data: &[u8]) -> Result<(usize, u8), ProtocolError> {
    let mut offset = IPV6_HEADER_LEN;
    let mut nh = data[6];
    let mut count = 0;
    while is_extension_header(nh) && count < MAX_EXTENSION_HEADERS {
        if data.len() < offset + 8 {
            return Err(ProtocolError::too_short("ipv6", offset + 8, data.len()));
        }
        let ext_len = match nh {
            next_header::FRAGMENT => 8,
            next_header::AH => (usize::from(data[offset + 1]) + 2) * 4,
            _ => (usize::from(data[offset + 1]) + 1) * 8,
        };
        if data.len() < offset + ext_len {
            return Err(ProtocolError::too_short("ipv6", offset + ext_len, data.len()));
        }
        nh = data[offset];
        offset += ext_len;
        count += 1;
    }
    Ok((offset, nh))
}

/// IPv6 protocol.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Protocol;

impl Protocol for Ipv6Protocol {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::Ipv6
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::Network
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        Ipv6HeaderSlice::from_slice(data).map_err(|e| ProtocolError::InvalidField {
            protocol: "ipv6",
            field: "header",
            reason: e.to_string(),
        })?;
        walk_extensions(data).map(|(len, _)| len)
    }

    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType> {
        if data.len() <= header_len {
            return None;
        }
        let (_, nh) = walk_extensions(data).ok()?;
        kind_for_ip_protocol(nh)
    }

    fn declared_len(&self, data: &[u8]) -> Option<usize> {
        Some(IPV6_HEADER_LEN + usize::from(read_u16(data, 4)))
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        let payload_len = cx.data.len().saturating_sub(IPV6_HEADER_LEN);
        write_u16(cx.data, 4, u16::try_from(payload_len).unwrap_or(u16::MAX));
        // With extension headers the last one carries the upper protocol.
        if cx.header_len == IPV6_HEADER_LEN {
            if let Some(nh) = cx.next.and_then(ip_protocol_for) {
                cx.data[6] = nh;
            }
        }
    }

    fn summary(&self, data: &[u8]) -> String {
        match Ipv6HeaderSlice::from_slice(data) {
            Ok(ip) => format!(
                "IPv6 Layer, Src: {}, Dst: {}",
                ip.source_addr(),
                ip.destination_addr()
            ),
            Err(_) => "IPv6 Layer".to_string(),
        }
    }
}

fn addr_at(data: &[u8], at: usize) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&data[at..at + 16]);
    Ipv6Addr::from(octets)
}

layer_view!(
    /// IPv6 view.
    Ipv6Layer,
    ProtocolType::Ipv6
);

impl<P: std::ops::Deref<Target = crate::Packet>> Ipv6Layer<P> {
    pub fn source(&self) -> Ipv6Addr {
        addr_at(self.bytes(), 8)
    }

    pub fn destination(&self) -> Ipv6Addr {
        addr_at(self.bytes(), 24)
    }

    pub fn payload_len(&self) -> u16 {
        read_u16(self.bytes(), 4)
    }

    pub fn hop_limit(&self) -> u8 {
        self.bytes()[7]
    }

    /// Next header of the fixed header (the first extension, if any).
    pub fn next_header(&self) -> u8 {
        self.bytes()[6]
    }
}

impl<P: std::ops::DerefMut<Target = crate::Packet>> Ipv6Layer<P> {
    pub fn set_source(&mut self, addr: Ipv6Addr) {
        self.bytes_mut()[8..24].copy_from_slice(&addr.octets());
    }

    pub fn set_destination(&mut self, addr: Ipv6Addr) {
        self.bytes_mut()[24..40].copy_from_slice(&addr.octets());
    }

    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.bytes_mut()[7] = hop_limit;
    }
}

impl Ipv6Layer<&crate::Packet> {
    /// 40-byte header; payload length and next header come from calculated
    /// fields.
    pub fn build(source: Ipv6Addr, destination: Ipv6Addr, hop_limit: u8) -> DetachedLayer {
        let mut bytes = vec![0u8; IPV6_HEADER_LEN];
        bytes[0] = 0x60;
        bytes[6] = next_header::NO_NEXT_HEADER;
        bytes[7] = hop_limit;
        bytes[8..24].copy_from_slice(&source.octets());
        bytes[24..40].copy_from_slice(&destination.octets());
        DetachedLayer::new(ProtocolType::Ipv6, bytes)
    }
}
