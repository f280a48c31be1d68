//! Static dispatch over the built-in layer kinds.

use crate::error::ProtocolError;

use super::{
    ComputeContext, EthernetProtocol, GtpV1Protocol, IcmpProtocol, Ipv4Protocol, Ipv6Protocol,
    OsiModelLayer, Protocol, ProtocolType, TcpProtocol, TrailerProtocol, UdpProtocol,
};

/// Enum of all built-in layer kinds.
///
/// This enables static dispatch (no vtable overhead) for every layer the
/// packet walks. The compiler can inline match arms.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinProtocol {
    Ethernet(EthernetProtocol),
    Ipv4(Ipv4Protocol),
    Ipv6(Ipv6Protocol),
    Udp(UdpProtocol),
    Tcp(TcpProtocol),
    Icmp(IcmpProtocol),
    GtpV1(GtpV1Protocol),
    Trailer(TrailerProtocol),
}

impl BuiltinProtocol {
    /// Dispatch entry for a concrete kind; `None` for query categories.
    pub fn for_kind(kind: ProtocolType) -> Option<Self> {
        Some(match kind {
            ProtocolType::Ethernet => BuiltinProtocol::Ethernet(EthernetProtocol),
            ProtocolType::Ipv4 => BuiltinProtocol::Ipv4(Ipv4Protocol),
            ProtocolType::Ipv6 => BuiltinProtocol::Ipv6(Ipv6Protocol),
            ProtocolType::Udp => BuiltinProtocol::Udp(UdpProtocol),
            ProtocolType::Tcp => BuiltinProtocol::Tcp(TcpProtocol),
            ProtocolType::Icmp => BuiltinProtocol::Icmp(IcmpProtocol),
            ProtocolType::GtpV1 => BuiltinProtocol::GtpV1(GtpV1Protocol),
            ProtocolType::PacketTrailer => BuiltinProtocol::Trailer(TrailerProtocol),
            ProtocolType::Ip | ProtocolType::Gtp | ProtocolType::GtpU | ProtocolType::GtpC => {
                return None
            }
        })
    }
}

/// Macro to delegate a method call to the inner protocol.
macro_rules! delegate_protocol {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinProtocol::Ethernet(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv4(p) => p.$method($($arg),*),
            BuiltinProtocol::Ipv6(p) => p.$method($($arg),*),
            BuiltinProtocol::Udp(p) => p.$method($($arg),*),
            BuiltinProtocol::Tcp(p) => p.$method($($arg),*),
            BuiltinProtocol::Icmp(p) => p.$method($($arg),*),
            BuiltinProtocol::GtpV1(p) => p.$method($($arg),*),
            BuiltinProtocol::Trailer(p) => p.$method($($arg),*),
        }
    };
}

impl Protocol for BuiltinProtocol {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_protocol!(self, name)
    }

    #[inline]
    fn display_name(&self) -> &'static str {
        delegate_protocol!(self, display_name)
    }

    #[inline]
    fn kind(&self) -> ProtocolType {
        delegate_protocol!(self, kind)
    }

    #[inline]
    fn osi_layer(&self) -> OsiModelLayer {
        delegate_protocol!(self, osi_layer)
    }

    #[inline]
    fn header_len(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        delegate_protocol!(self, header_len, data)
    }

    #[inline]
    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType> {
        delegate_protocol!(self, next_layer, data, header_len)
    }

    #[inline]
    fn declared_len(&self, data: &[u8]) -> Option<usize> {
        delegate_protocol!(self, declared_len, data)
    }

    #[inline]
    fn compute_fields(&self, cx: ComputeContext<'_>) {
        delegate_protocol!(self, compute_fields, cx)
    }

    #[inline]
    fn summary(&self, data: &[u8]) -> String {
        delegate_protocol!(self, summary, data)
    }
}
