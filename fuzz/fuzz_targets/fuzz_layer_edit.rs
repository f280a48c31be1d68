//! Fuzz target for in-place GTPv1 growth.
//!
//! The first bytes pick the edits, the rest is the GTP message. After every
//! edit the layers following GTP must still start right where the GTP header
//! ends, and calculated fields must not panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktstack_core::{GtpV1Layer, Packet};

const OUTER: [u8; 42] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x08, 0x00, // eth
    0x45, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00, // ipv4
    0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02, //
    0x08, 0x68, 0x08, 0x68, 0x00, 0x00, 0x00, 0x00, // udp 2152 -> 2152
];

fuzz_target!(|data: &[u8]| {
    let Some((&ops, gtp)) = data.split_first() else {
        return;
    };
    let mut frame = OUTER.to_vec();
    frame.extend_from_slice(gtp);
    let mut packet = Packet::from_bytes(frame);
    packet.compute_calculated_fields();
    let layers_before = packet.layer_count();

    {
        let Some(mut layer) = packet.layer_of_type_mut::<GtpV1Layer<_>>() else {
            return;
        };
        if ops & 0x01 != 0 {
            let _ = layer.set_sequence_number(u16::from(ops));
        }
        if ops & 0x02 != 0 {
            let _ = layer.set_npdu_number(ops);
        }
        if ops & 0x04 != 0 {
            let _ = layer.add_extension(0xc0, u16::from(ops) << 4);
        }
        if ops & 0x08 != 0 {
            let _ = layer.clear_sequence_number();
        }
        if ops & 0x10 != 0 {
            let _ = layer.clear_npdu_number();
        }
    }

    assert_eq!(packet.layer_count(), layers_before);
    let mut expected = 0;
    for layer in packet.layers() {
        assert_eq!(layer.offset(), expected);
        expected += layer.data().len();
    }
    assert_eq!(expected, packet.len());
    packet.compute_calculated_fields();
});
