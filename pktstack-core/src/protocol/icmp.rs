//! ICMP layer.

use super::checksum::internet_checksum;
use super::ipv6::next_header;
use super::{
    read_u16, write_u16, ComputeContext, OsiModelLayer, Protocol, ProtocolError, ProtocolType,
};
use crate::layer::{layer_view, DetachedLayer};

/// IP protocol number for ICMP.
pub const IP_PROTO_ICMP: u8 = next_header::ICMP;

/// ICMP header length (type, code, checksum, rest-of-header).
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types.
pub mod icmp_type {
    pub const ECHO_REPLY: u8 = 0;
    pub const DESTINATION_UNREACHABLE: u8 = 3;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;
    pub const TIME_EXCEEDED: u8 = 11;
    pub const PARAMETER_PROBLEM: u8 = 12;
    pub const TIMESTAMP: u8 = 13;
    pub const TIMESTAMP_REPLY: u8 = 14;
}

fn icmp_type_name(icmp_type: u8) -> &'static str {
    match icmp_type {
        icmp_type::ECHO_REPLY => "Echo Reply",
        icmp_type::DESTINATION_UNREACHABLE => "Destination Unreachable",
        icmp_type::REDIRECT => "Redirect",
        icmp_type::ECHO_REQUEST => "Echo Request",
        icmp_type::TIME_EXCEEDED => "Time Exceeded",
        icmp_type::PARAMETER_PROBLEM => "Parameter Problem",
        icmp_type::TIMESTAMP => "Timestamp",
        icmp_type::TIMESTAMP_REPLY => "Timestamp Reply",
        _ => "Unknown",
    }
}

/// ICMP protocol.
#[derive(Debug, Clone, Copy)]
pub struct IcmpProtocol;

impl Protocol for IcmpProtocol {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn display_name(&self) -> &'static str {
        "ICMP"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::Icmp
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::Network
    }

    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(ProtocolError::too_short("icmp", ICMP_HEADER_LEN, data.len()));
        }
        Ok(ICMP_HEADER_LEN)
    }

    fn next_layer(&self, _data: &[u8], _header_len: usize) -> Option<ProtocolType> {
        None
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        write_u16(cx.data, 2, 0);
        let checksum = internet_checksum(cx.data);
        write_u16(cx.data, 2, checksum);
    }

    fn summary(&self, data: &[u8]) -> String {
        match data.first() {
            Some(&t) => format!("ICMP Layer, {}", icmp_type_name(t)),
            None => "ICMP Layer".to_string(),
        }
    }
}

layer_view!(
    /// ICMP view.
    IcmpLayer,
    ProtocolType::Icmp
);

impl<P: std::ops::Deref<Target = crate::Packet>> IcmpLayer<P> {
    pub fn icmp_type(&self) -> u8 {
        self.bytes()[0]
    }

    pub fn code(&self) -> u8 {
        self.bytes()[1]
    }

    pub fn checksum(&self) -> u16 {
        read_u16(self.bytes(), 2)
    }

    pub fn is_echo_request(&self) -> bool {
        self.icmp_type() == icmp_type::ECHO_REQUEST
    }

    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type() == icmp_type::ECHO_REPLY
    }

    /// Echo identifier; only meaningful for echo messages.
    pub fn echo_id(&self) -> u16 {
        read_u16(self.bytes(), 4)
    }

    /// Echo sequence number; only meaningful for echo messages.
    pub fn echo_sequence(&self) -> u16 {
        read_u16(self.bytes(), 6)
    }
}

impl IcmpLayer<&crate::Packet> {
    /// Echo request carrying `data`; checksum comes from calculated fields.
    pub fn build_echo_request(id: u16, sequence: u16, data: &[u8]) -> DetachedLayer {
        let mut bytes = vec![0u8; ICMP_HEADER_LEN];
        bytes[0] = icmp_type::ECHO_REQUEST;
        write_u16(&mut bytes, 4, id);
        write_u16(&mut bytes, 6, sequence);
        bytes.extend_from_slice(data);
        DetachedLayer::new(ProtocolType::Icmp, bytes)
    }
}
