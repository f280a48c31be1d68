//! Protocol layer framework.
//!
//! This module provides:
//! - [`ProtocolType`], the closed set of layer kinds plus the category kinds
//!   used in queries
//! - [`Protocol`], the stateless per-kind dispatch table every layer kind
//!   implements (header length, next-layer identification, calculated fields)
//! - [`BuiltinProtocol`], static dispatch over the built-in kinds
//! - Typed layer views ([`EthLayer`], [`Ipv4Layer`], [`GtpV1Layer`], ...)
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II, packet trailer |
//! | Network | IPv4, IPv6, ICMP |
//! | Transport | TCP, UDP, GTPv1 (GTP-U / GTP-C) |

mod checksum;
mod ethernet;
mod gtp;
mod gtp_extension;
mod icmp;
mod ipv4;
mod ipv6;
mod registry;
mod tcp;
mod trailer;
mod udp;

use std::fmt;

use crate::error::ProtocolError;

pub use registry::BuiltinProtocol;

pub use ethernet::{ethertype, EthLayer, EthernetProtocol};
pub use gtp::{
    extension_header_type, GtpV1Header, GtpV1Layer, GtpV1MessageType, GtpV1Protocol,
    GTP_C_PORT, GTP_HEADER_LEN, GTP_U_PORT, UNKNOWN_MESSAGE_TYPE,
};
pub use gtp_extension::{GtpExtension, GtpExtensions};
pub use icmp::{icmp_type, IcmpLayer, IcmpProtocol, IP_PROTO_ICMP};
pub use ipv4::{Ipv4Layer, Ipv4Protocol};
pub use ipv6::{next_header, Ipv6Layer, Ipv6Protocol};
pub use tcp::{TcpLayer, TcpProtocol, IP_PROTO_TCP};
pub use trailer::TrailerProtocol;
pub use udp::{UdpLayer, UdpProtocol, IP_PROTO_UDP};

/// Layer kinds.
///
/// The first group names concrete layers; every parsed layer has one of
/// those. `Ip`, `Gtp`, `GtpU` and `GtpC` are categories that only appear in
/// queries such as [`Packet::is_packet_of_type`](crate::Packet::is_packet_of_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolType {
    Ethernet,
    Ipv4,
    Ipv6,
    Udp,
    Tcp,
    Icmp,
    GtpV1,
    /// Link-layer padding after the outermost IP datagram.
    PacketTrailer,

    /// IPv4 or IPv6.
    Ip,
    /// Any GTP version.
    Gtp,
    /// GTPv1 carrying a user-plane (G-PDU) message.
    GtpU,
    /// GTPv1 carrying a control-plane message.
    GtpC,
}

impl ProtocolType {
    /// Whether this is a layer kind rather than a query category.
    pub fn is_concrete(self) -> bool {
        !matches!(
            self,
            ProtocolType::Ip | ProtocolType::Gtp | ProtocolType::GtpU | ProtocolType::GtpC
        )
    }

    /// Whether a layer of concrete kind `kind` belongs to this kind or
    /// category.
    ///
    /// `GtpU` and `GtpC` match any GTPv1 layer here; the message type
    /// refinement needs the layer bytes and happens in
    /// [`Layer::is_of_type`](crate::Layer::is_of_type).
    pub fn contains(self, kind: ProtocolType) -> bool {
        match self {
            ProtocolType::Ip => matches!(kind, ProtocolType::Ipv4 | ProtocolType::Ipv6),
            ProtocolType::Gtp | ProtocolType::GtpU | ProtocolType::GtpC => {
                kind == ProtocolType::GtpV1
            }
            other => other == kind,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProtocolType::Ethernet => "Ethernet",
            ProtocolType::Ipv4 => "IPv4",
            ProtocolType::Ipv6 => "IPv6",
            ProtocolType::Udp => "UDP",
            ProtocolType::Tcp => "TCP",
            ProtocolType::Icmp => "ICMP",
            ProtocolType::GtpV1 => "GTPv1",
            ProtocolType::PacketTrailer => "Packet Trailer",
            ProtocolType::Ip => "IP",
            ProtocolType::Gtp => "GTP",
            ProtocolType::GtpU => "GTP-U",
            ProtocolType::GtpC => "GTP-C",
        }
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// OSI model layer a protocol sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OsiModelLayer {
    Physical = 1,
    DataLink = 2,
    Network = 3,
    Transport = 4,
    Session = 5,
    Presentation = 6,
    Application = 7,
}

/// The layer just below the one whose fields are being computed.
#[derive(Debug, Clone, Copy)]
pub struct PrevLayer<'a> {
    pub kind: ProtocolType,
    /// Bytes from the start of that layer up to the start of the current one.
    pub data: &'a [u8],
}

/// Input to [`Protocol::compute_fields`].
#[derive(Debug)]
pub struct ComputeContext<'a> {
    /// Layer bytes, from the layer start to the end of the packet payload
    /// (a trailing padding trailer is excluded).
    pub data: &'a mut [u8],
    pub header_len: usize,
    pub prev: Option<PrevLayer<'a>>,
    /// Kind of the layer that follows, if any.
    pub next: Option<ProtocolType>,
}

/// Per-kind behaviour of a layer.
///
/// Implementations are stateless; they read and write the bytes handed to
/// them. `data` always starts at the layer's first byte and runs to the end of
/// the packet payload.
pub trait Protocol: Send + Sync {
    /// Short identifier used in logs (e.g., "ipv4", "gtpv1").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    fn kind(&self) -> ProtocolType;

    fn osi_layer(&self) -> OsiModelLayer;

    /// Length of this layer's header, never more than `data.len()`.
    ///
    /// An error means the bytes do not hold a readable header of this kind.
    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError>;

    /// Kind of the layer starting right after the header, if recognized.
    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType>;

    /// Total datagram length a network header declares for itself.
    ///
    /// Used to tell link-layer padding apart from payload.
    fn declared_len(&self, _data: &[u8]) -> Option<usize> {
        None
    }

    /// Fix fields that depend on the layers above (lengths, next-protocol
    /// identifiers, checksums).
    fn compute_fields(&self, cx: ComputeContext<'_>);

    /// One-line description of the layer.
    fn summary(&self, data: &[u8]) -> String;
}

#[inline]
pub(crate) fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

#[inline]
pub(crate) fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[inline]
pub(crate) fn write_u16(data: &mut [u8], at: usize, value: u16) {
    data[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

#[inline]
pub(crate) fn write_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_matching() {
        assert!(ProtocolType::Ip.contains(ProtocolType::Ipv4));
        assert!(ProtocolType::Ip.contains(ProtocolType::Ipv6));
        assert!(!ProtocolType::Ip.contains(ProtocolType::Udp));
        assert!(ProtocolType::Gtp.contains(ProtocolType::GtpV1));
        assert!(ProtocolType::GtpV1.contains(ProtocolType::GtpV1));
        assert!(!ProtocolType::GtpV1.contains(ProtocolType::Udp));
        assert!(!ProtocolType::Ipv4.contains(ProtocolType::Ipv6));
    }

    #[test]
    fn test_concrete_kinds() {
        assert!(ProtocolType::Ethernet.is_concrete());
        assert!(ProtocolType::PacketTrailer.is_concrete());
        assert!(!ProtocolType::Ip.is_concrete());
        assert!(!ProtocolType::GtpU.is_concrete());
    }

    #[test]
    fn test_osi_ordering() {
        assert!(OsiModelLayer::DataLink < OsiModelLayer::Network);
        assert!(OsiModelLayer::Transport > OsiModelLayer::Network);
    }
}
