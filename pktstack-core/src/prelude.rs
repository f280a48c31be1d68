//! Convenient re-exports for common usage.
//!
//! ```rust
//! use pktstack_core::prelude::*;
//!
//! let packet = Packet::from_bytes(vec![0u8; 14]);
//! assert_eq!(packet.first_layer().map(|l| l.kind()), Some(ProtocolType::Ethernet));
//! ```

// Packet and buffers
pub use crate::buffer::{link_type, RawBuffer, RawPacket};
pub use crate::options::ParseOptions;
pub use crate::packet::Packet;

// Layers
pub use crate::layer::{DetachedLayer, Layer, LayerRef};
pub use crate::protocol::{
    extension_header_type, EthLayer, GtpExtension, GtpV1Layer, GtpV1MessageType, IcmpLayer,
    Ipv4Layer, Ipv6Layer, OsiModelLayer, ProtocolType, TcpLayer, UdpLayer,
};

// Error types
pub use crate::error::{Error, Result};
