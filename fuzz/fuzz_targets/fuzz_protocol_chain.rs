//! Fuzz target for the layer parse loop.
//!
//! Every input must parse without panicking, tile the buffer with layer
//! regions, and come back unchanged when re-serialized without edits.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktstack_core::{link_type, Packet, RawPacket};

fuzz_target!(|data: &[u8]| {
    for link in [link_type::ETHERNET, link_type::RAW, link_type::IPV4, link_type::IPV6] {
        let packet = Packet::new(RawPacket::new(data.to_vec(), link, 0));

        let mut expected = packet.first_layer().map_or(data.len(), |l| l.offset());
        for layer in packet.layers() {
            assert_eq!(layer.offset(), expected);
            assert!(layer.header_len() <= layer.data().len());
            let _ = layer.summary();
            expected += layer.data().len();
        }
        assert_eq!(expected, data.len());
        assert_eq!(packet.as_bytes(), data);
    }
});
