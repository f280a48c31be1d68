//! Internet checksum helpers shared by IPv4, UDP, TCP and ICMP.

use etherparse::checksum::Sum16BitWords;

use super::{PrevLayer, ProtocolType};

/// One's complement checksum of `data`, ready to be written big-endian.
///
/// The checksum field inside `data` must already be zeroed.
pub(crate) fn internet_checksum(data: &[u8]) -> u16 {
    Sum16BitWords::new().add_slice(data).ones_complement().to_be()
}

/// Pseudo-header sum for a transport segment carried by `prev`.
///
/// `None` when the layer below is not IP or too short to hold addresses.
fn pseudo_header(prev: &PrevLayer<'_>, ip_proto: u8, segment_len: usize) -> Option<Sum16BitWords> {
    match prev.kind {
        ProtocolType::Ipv4 if prev.data.len() >= 20 => {
            let len = u16::try_from(segment_len).ok()?;
            Some(
                Sum16BitWords::new()
                    .add_slice(&prev.data[12..20])
                    .add_2bytes([0, ip_proto])
                    .add_2bytes(len.to_be_bytes()),
            )
        }
        ProtocolType::Ipv6 if prev.data.len() >= 40 => {
            let len = u32::try_from(segment_len).ok()?;
            Some(
                Sum16BitWords::new()
                    .add_slice(&prev.data[8..40])
                    .add_4bytes(len.to_be_bytes())
                    .add_2bytes([0, ip_proto]),
            )
        }
        _ => None,
    }
}

/// Checksum of a UDP or TCP segment with its pseudo-header.
///
/// A computed value of zero is sent as `0xffff`.
pub(crate) fn transport_checksum(prev: &PrevLayer<'_>, ip_proto: u8, segment: &[u8]) -> Option<u16> {
    let sum = pseudo_header(prev, ip_proto, segment.len())?;
    Some(sum.add_slice(segment).to_ones_complement_with_no_zero().to_be())
}
