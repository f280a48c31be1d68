//! Frame builders for integration tests.
//!
//! Checksums and lengths are computed here without going through the crate,
//! so the reference frames double as an oracle for calculated fields.

#![allow(dead_code)]

use std::net::{Ipv4Addr, Ipv6Addr};

pub const GTP_U_PORT: u16 = 2152;
pub const GTP_C_PORT: u16 = 2123;

/// Install a test subscriber once; `RUST_LOG=pktstack_core=trace` shows the
/// parse loop.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Compare frames as hex so a mismatch points at the differing bytes.
#[track_caller]
pub fn assert_frame_eq(actual: &[u8], expected: &[u8]) {
    assert_eq!(hex::encode(actual), hex::encode(expected));
}

fn ones_complement_sum(chunks: &[&[u8]]) -> u16 {
    let mut sum: u32 = 0;
    for chunk in chunks {
        let mut words = chunk.chunks(2);
        for word in &mut words {
            let hi = u32::from(word[0]) << 8;
            let lo = word.get(1).map_or(0, |&b| u32::from(b));
            sum += hi | lo;
        }
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn transport_checksum(pseudo: &[u8], segment: &[u8]) -> u16 {
    match ones_complement_sum(&[pseudo, segment]) {
        0 => 0xffff,
        sum => sum,
    }
}

fn ipv4_pseudo_header(src: Ipv4Addr, dst: Ipv4Addr, proto: u8, len: usize) -> Vec<u8> {
    let mut pseudo = Vec::with_capacity(12);
    pseudo.extend_from_slice(&src.octets());
    pseudo.extend_from_slice(&dst.octets());
    pseudo.extend_from_slice(&[0, proto]);
    pseudo.extend_from_slice(&(len as u16).to_be_bytes());
    pseudo
}

fn ipv6_pseudo_header(src: Ipv6Addr, dst: Ipv6Addr, proto: u8, len: usize) -> Vec<u8> {
    let mut pseudo = Vec::with_capacity(40);
    pseudo.extend_from_slice(&src.octets());
    pseudo.extend_from_slice(&dst.octets());
    pseudo.extend_from_slice(&(len as u32).to_be_bytes());
    pseudo.extend_from_slice(&[0, 0, 0, proto]);
    pseudo
}

/// Addresses a transport checksum is computed against.
#[derive(Debug, Clone, Copy)]
pub enum Pseudo {
    V4(Ipv4Addr, Ipv4Addr),
    V6(Ipv6Addr, Ipv6Addr),
}

impl Pseudo {
    fn header(self, proto: u8, len: usize) -> Vec<u8> {
        match self {
            Pseudo::V4(src, dst) => ipv4_pseudo_header(src, dst, proto, len),
            Pseudo::V6(src, dst) => ipv6_pseudo_header(src, dst, proto, len),
        }
    }
}

/// Builder for Ethernet II frames.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    ethertype: u16,
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0x00, 0x66, 0x77, 0x88, 0x99, 0xaa],
            ethertype: 0x0800,
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn dst_mac(mut self, mac: [u8; 6]) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn ipv6(mut self) -> Self {
        self.ethertype = 0x86dd;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// Builder for IPv4 datagrams; total length and checksum are filled in.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    identification: u16,
    flags_fragment: u16,
    ttl: u8,
    protocol: u8,
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            identification: 0,
            flags_fragment: 0,
            ttl: 64,
            protocol: 17,
            src_ip: Ipv4Addr::new(192, 168, 1, 1),
            dst_ip: Ipv4Addr::new(192, 168, 1, 2),
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn dont_fragment(mut self) -> Self {
        self.flags_fragment = 0x4000;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(6)
    }

    pub fn udp(self) -> Self {
        self.protocol(17)
    }

    pub fn icmp(self) -> Self {
        self.protocol(1)
    }

    pub fn src_ip(mut self, ip: Ipv4Addr) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: Ipv4Addr) -> Self {
        self.dst_ip = ip;
        self
    }

    pub fn pseudo(&self) -> Pseudo {
        Pseudo::V4(self.src_ip, self.dst_ip)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = (20 + self.payload.len()) as u16;
        let mut packet = Vec::with_capacity(20 + self.payload.len());
        packet.push(0x45);
        packet.push(0x00);
        packet.extend_from_slice(&total_length.to_be_bytes());
        packet.extend_from_slice(&self.identification.to_be_bytes());
        packet.extend_from_slice(&self.flags_fragment.to_be_bytes());
        packet.push(self.ttl);
        packet.push(self.protocol);
        packet.extend_from_slice(&[0x00, 0x00]);
        packet.extend_from_slice(&self.src_ip.octets());
        packet.extend_from_slice(&self.dst_ip.octets());
        let checksum = ones_complement_sum(&[&packet]);
        packet[10..12].copy_from_slice(&checksum.to_be_bytes());
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// Builder for IPv6 packets without extension headers.
#[derive(Debug, Clone)]
pub struct Ipv6Builder {
    next_header: u8,
    hop_limit: u8,
    src_ip: Ipv6Addr,
    dst_ip: Ipv6Addr,
    payload: Vec<u8>,
}

impl Default for Ipv6Builder {
    fn default() -> Self {
        Self {
            next_header: 17,
            hop_limit: 64,
            src_ip: Ipv6Addr::LOCALHOST,
            dst_ip: Ipv6Addr::LOCALHOST,
            payload: Vec::new(),
        }
    }
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_header(mut self, next_header: u8) -> Self {
        self.next_header = next_header;
        self
    }

    pub fn hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    pub fn src_ip(mut self, ip: Ipv6Addr) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: Ipv6Addr) -> Self {
        self.dst_ip = ip;
        self
    }

    pub fn pseudo(&self) -> Pseudo {
        Pseudo::V6(self.src_ip, self.dst_ip)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(40 + self.payload.len());
        packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        packet.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        packet.push(self.next_header);
        packet.push(self.hop_limit);
        packet.extend_from_slice(&self.src_ip.octets());
        packet.extend_from_slice(&self.dst_ip.octets());
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// Builder for UDP datagrams; length and checksum are filled in.
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl UdpBuilder {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            src_port,
            dst_port,
            payload: Vec::new(),
        }
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self, pseudo: Pseudo) -> Vec<u8> {
        let length = 8 + self.payload.len();
        let mut datagram = Vec::with_capacity(length);
        datagram.extend_from_slice(&self.src_port.to_be_bytes());
        datagram.extend_from_slice(&self.dst_port.to_be_bytes());
        datagram.extend_from_slice(&(length as u16).to_be_bytes());
        datagram.extend_from_slice(&[0x00, 0x00]);
        datagram.extend_from_slice(&self.payload);
        let checksum = transport_checksum(&pseudo.header(17, length), &datagram);
        datagram[6..8].copy_from_slice(&checksum.to_be_bytes());
        datagram
    }
}

/// Builder for TCP segments without options.
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: u8,
    window: u16,
    payload: Vec<u8>,
}

impl TcpBuilder {
    pub fn new(src_port: u16, dst_port: u16) -> Self {
        Self {
            src_port,
            dst_port,
            seq: 1,
            ack: 0,
            flags: 0x02,
            window: 65535,
            payload: Vec::new(),
        }
    }

    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self, pseudo: Pseudo) -> Vec<u8> {
        let mut segment = Vec::with_capacity(20 + self.payload.len());
        segment.extend_from_slice(&self.src_port.to_be_bytes());
        segment.extend_from_slice(&self.dst_port.to_be_bytes());
        segment.extend_from_slice(&self.seq.to_be_bytes());
        segment.extend_from_slice(&self.ack.to_be_bytes());
        segment.push(5 << 4);
        segment.push(self.flags);
        segment.extend_from_slice(&self.window.to_be_bytes());
        segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        segment.extend_from_slice(&self.payload);
        let checksum = transport_checksum(&pseudo.header(6, segment.len()), &segment);
        segment[16..18].copy_from_slice(&checksum.to_be_bytes());
        segment
    }
}

/// ICMP echo request with checksum.
pub fn icmp_echo_request(id: u16, seq: u16, data: &[u8]) -> Vec<u8> {
    let mut packet = vec![8, 0, 0, 0];
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(data);
    let checksum = ones_complement_sum(&[&packet]);
    packet[2..4].copy_from_slice(&checksum.to_be_bytes());
    packet
}

/// Builder for GTPv1 messages; flags and message length follow the fields.
#[derive(Debug, Clone)]
pub struct GtpBuilder {
    message_type: u8,
    teid: u32,
    sequence: Option<u16>,
    npdu: Option<u8>,
    extensions: Vec<(u8, Vec<u8>)>,
    payload: Vec<u8>,
}

impl GtpBuilder {
    pub fn g_pdu(teid: u32) -> Self {
        Self::new(255, teid)
    }

    pub fn new(message_type: u8, teid: u32) -> Self {
        Self {
            message_type,
            teid,
            sequence: None,
            npdu: None,
            extensions: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn teid(mut self, teid: u32) -> Self {
        self.teid = teid;
        self
    }

    pub fn sequence(mut self, sequence: u16) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn npdu(mut self, npdu: u8) -> Self {
        self.npdu = Some(npdu);
        self
    }

    /// Extension record; `content` must be 2 bytes short of a multiple of 4.
    pub fn extension(mut self, ext_type: u8, content: &[u8]) -> Self {
        assert_eq!((content.len() + 2) % 4, 0);
        self.extensions.push((ext_type, content.to_vec()));
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut flags = 0x30;
        if !self.extensions.is_empty() {
            flags |= 0x04;
        }
        if self.sequence.is_some() {
            flags |= 0x02;
        }
        if self.npdu.is_some() {
            flags |= 0x01;
        }

        let mut message = vec![flags, self.message_type, 0, 0];
        message.extend_from_slice(&self.teid.to_be_bytes());
        if flags & 0x07 != 0 {
            message.extend_from_slice(&self.sequence.unwrap_or(0).to_be_bytes());
            message.push(self.npdu.unwrap_or(0));
            message.push(self.extensions.first().map_or(0, |(t, _)| *t));
        }
        for (i, (_, content)) in self.extensions.iter().enumerate() {
            message.push(((content.len() + 2) / 4) as u8);
            message.extend_from_slice(content);
            message.push(self.extensions.get(i + 1).map_or(0, |(t, _)| *t));
        }
        message.extend_from_slice(&self.payload);
        let length = (message.len() - 8) as u16;
        message[2..4].copy_from_slice(&length.to_be_bytes());
        message
    }
}

/// Outer Ethernet / IPv4 / UDP around a GTP message.
pub fn outer_ipv4_udp(port: u16, gtp: Vec<u8>) -> Vec<u8> {
    let ip = Ipv4Builder::new()
        .identification(0x1c46)
        .dont_fragment()
        .src_ip(Ipv4Addr::new(192, 168, 40, 178))
        .dst_ip(Ipv4Addr::new(192, 168, 50, 52))
        .udp();
    let udp = UdpBuilder::new(port, port).payload(gtp).build(ip.pseudo());
    EthernetBuilder::new().payload(ip.payload(udp).build()).build()
}

pub const GTP_U1_INNER_SRC: Ipv4Addr = Ipv4Addr::new(202, 11, 40, 158);

/// Inner IPv4 / ICMP echo request carried by the gtp-u1 message.
pub fn gtp_u1_inner() -> Vec<u8> {
    let ip = Ipv4Builder::new()
        .identification(0x9f2a)
        .src_ip(GTP_U1_INNER_SRC)
        .dst_ip(Ipv4Addr::new(10, 10, 10, 10))
        .icmp();
    let data: Vec<u8> = (0u8..56).collect();
    ip.payload(icmp_echo_request(0x0a1b, 1, &data)).build()
}

/// gtp-u1: G-PDU, TEID 1, sequence number 10461, IPv4 / ICMP inside.
pub fn gtp_u1_gtp() -> GtpBuilder {
    GtpBuilder::g_pdu(1).sequence(10461).payload(gtp_u1_inner())
}

pub fn gtp_u1() -> Vec<u8> {
    outer_ipv4_udp(GTP_U_PORT, gtp_u1_gtp().build())
}

pub const GTP_U2_INNER_DST: Ipv4Addr = Ipv4Addr::new(10, 155, 186, 57);

/// gtp-u2: G-PDU with sequence number 5 and one PDCP PDU number extension,
/// 1508-byte message carrying IPv4 / TCP.
pub fn gtp_u2() -> Vec<u8> {
    let ip = Ipv4Builder::new()
        .identification(0x0001)
        .dont_fragment()
        .src_ip(Ipv4Addr::new(100, 64, 12, 7))
        .dst_ip(GTP_U2_INNER_DST)
        .tcp();
    let tcp = TcpBuilder::new(50000, 80)
        .seq(0x01020304)
        .flags(0x18)
        .payload((0..1460u32).map(|b| b as u8).collect())
        .build(ip.pseudo());
    let gtp = GtpBuilder::g_pdu(0x0010_0657)
        .sequence(5)
        .extension(0xc0, &[0x00, 0x2a])
        .payload(ip.payload(tcp).build())
        .build();
    outer_ipv4_udp(GTP_U_PORT, gtp)
}

pub fn gtp_u_ipv6_src() -> Ipv6Addr {
    "2001:507:0:1:200:8600:0:2".parse().unwrap()
}

/// gtp-u-ipv6: G-PDU without optional fields, IPv6 / UDP inside.
pub fn gtp_u_ipv6_gtp() -> GtpBuilder {
    let ip = Ipv6Builder::new()
        .src_ip(gtp_u_ipv6_src())
        .dst_ip("2001:507:0:1:200:8600:0:1".parse().unwrap());
    let udp = UdpBuilder::new(5060, 5060)
        .payload(b"OPTIONS sip:".to_vec())
        .build(ip.pseudo());
    GtpBuilder::g_pdu(2_327_461_905).payload(ip.payload(udp).build())
}

pub fn gtp_u_ipv6() -> Vec<u8> {
    outer_ipv4_udp(GTP_U_PORT, gtp_u_ipv6_gtp().build())
}

/// gtp-c1: SGSN Context Response, 44-byte message, sequence number 34062.
pub fn gtp_c1() -> Vec<u8> {
    let mut elements = vec![0x01, 0x80]; // cause: request accepted
    elements.extend_from_slice(&[0xff, 0x00, 0x23]); // private extension, 35 bytes
    elements.extend((0u8..35).map(|b| b.wrapping_mul(7)));
    let gtp = GtpBuilder::new(51, 0x09fe_4b60)
        .sequence(34062)
        .payload(elements)
        .build();
    outer_ipv4_udp(GTP_C_PORT, gtp)
}
