//! Fuzz target for the GTPv1 layer.
//!
//! Wraps the input in Ethernet + IPv4 + UDP on the GTP-U and GTP-C ports and
//! walks everything a GTPv1 view exposes:
//! - optional region gated by the E / S / PN flags
//! - extension record chain
//! - control-plane information elements as part of the header

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktstack_core::{GtpV1Layer, Packet};

fn frame(port: u16, gtp: &[u8]) -> Vec<u8> {
    let mut frame = vec![
        // Ethernet header (14 bytes)
        0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // dst mac
        0x00, 0x00, 0x00, 0x00, 0x00, 0x02, // src mac
        0x08, 0x00, // ethertype IPv4
        // IPv4 header (20 bytes)
        0x45, 0x00, 0x00, 0x00, // version=4, ihl=5, dscp=0, total_len (computed)
        0x00, 0x01, 0x00, 0x00, // id=1, flags=0, frag_offset=0
        0x40, 0x11, 0x00, 0x00, // ttl=64, protocol=UDP(17), checksum
        0x0a, 0x00, 0x00, 0x01, // src ip: 10.0.0.1
        0x0a, 0x00, 0x00, 0x02, // dst ip: 10.0.0.2
        // UDP header (8 bytes)
        0x00, 0x00, 0x00, 0x00, // ports
        0x00, 0x00, 0x00, 0x00, // length (computed), checksum disabled
    ];
    frame[34..36].copy_from_slice(&port.to_be_bytes());
    frame[36..38].copy_from_slice(&port.to_be_bytes());
    frame.extend_from_slice(gtp);
    let mut packet = Packet::from_bytes(frame);
    packet.compute_calculated_fields();
    packet.as_bytes().to_vec()
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    for port in [2152u16, 2123] {
        let packet = Packet::from_bytes(frame(port, data));
        let Some(gtp) = packet.layer_of_type::<GtpV1Layer<_>>() else {
            continue;
        };
        let header_len = gtp.header_len();
        assert!(header_len <= gtp.as_layer().data().len());

        let _ = gtp.sequence_number();
        let _ = gtp.npdu_number();
        let _ = gtp.message_type_name();
        let mut walked = 0;
        for ext in gtp.extensions() {
            walked += ext.total_len();
            let _ = ext.content();
        }
        assert!(walked <= header_len);
        let _ = packet.to_string();
    }
});
