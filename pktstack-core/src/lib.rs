//! # pktstack-core
//!
//! Layered packet decoding and encoding over a single contiguous buffer.
//!
//! A [`Packet`] owns the frame bytes and an ordered list of layer
//! descriptors. Layers are parsed top-down from the link type, read and
//! edited through typed views, grown in place (GTPv1 optional fields and
//! extension headers), added, inserted or removed, and finally re-encoded by
//! [`Packet::compute_calculated_fields`], which fixes lengths, next-protocol
//! fields and checksums from the innermost layer outwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::net::Ipv4Addr;
//!
//! use pktstack_core::prelude::*;
//!
//! let mut packet = Packet::empty(link_type::ETHERNET);
//! packet
//!     .add_layer(EthLayer::build([0x02, 0, 0, 0, 0, 1], [0x02, 0, 0, 0, 0, 2]))
//!     .unwrap();
//! packet
//!     .add_layer(Ipv4Layer::build(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 64))
//!     .unwrap();
//! packet.add_layer(UdpLayer::build(2152, 2152)).unwrap();
//! packet
//!     .add_layer(GtpV1Layer::build(GtpV1MessageType::GPdu, 1, Some(7), None))
//!     .unwrap();
//!
//! let mut gtp = packet.layer_of_type_mut::<GtpV1Layer<_>>().unwrap();
//! gtp.add_extension(extension_header_type::PDCP_PDU_NUMBER, 2308).unwrap();
//! packet.compute_calculated_fields();
//!
//! let reparsed = Packet::from_bytes(packet.as_bytes().to_vec());
//! assert!(reparsed.is_packet_of_type(ProtocolType::GtpU));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        pktstack-core                                |
//! +---------------------------------------------------------------------+
//! |  buffer/     - RawBuffer (growable bytes), RawPacket, link types    |
//! |  packet/     - Packet: parse loop, layer list, add/insert/remove    |
//! |  layer/      - Layer view, LayerRef handle, typed view macro        |
//! |  protocol/   - Protocol trait, BuiltinProtocol, GTPv1 + collaborators|
//! |  options/    - ParseOptions                                         |
//! |  error/      - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Supported Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet II, packet trailer |
//! | Network | IPv4, IPv6, ICMP |
//! | Transport | TCP, UDP, GTPv1 (GTP-U and GTP-C) |

mod buffer;
pub mod error;
pub mod layer;
mod options;
mod packet;
pub mod prelude;
pub mod protocol;

// Re-export commonly used types at crate root for convenience
pub use buffer::{link_type, RawBuffer, RawPacket};
pub use error::{Error, ProtocolError, Result};
pub use layer::{DetachedLayer, Layer, LayerRef, TypedLayer};
pub use options::{ParseOptions, DEFAULT_MAX_LAYERS};
pub use packet::Packet;
pub use protocol::{
    EthLayer, GtpExtension, GtpExtensions, GtpV1Header, GtpV1Layer, GtpV1MessageType,
    IcmpLayer, Ipv4Layer, Ipv6Layer, OsiModelLayer, ProtocolType, TcpLayer, UdpLayer,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
