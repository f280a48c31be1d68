//! GTPv1 (GPRS Tunnelling Protocol version 1) layer.
//!
//! 3GPP TS 29.060: GPRS Tunnelling Protocol (GTP) across the Gn and Gp interface
//! 3GPP TS 29.281: GPRS Tunnelling Protocol User Plane (GTPv1-U)
//!
//! Wire layout:
//!
//! ```text
//!  0        1        2        3        4 ..  7
//! +--------+--------+--------+--------+----------+
//! | flags  | msg    | message length  |   TEID   |   fixed header
//! +--------+--------+--------+--------+----------+
//! | sequence number | N-PDU  | next   |              present if E, S or PN
//! +--------+--------+--------+--------+
//! | len    | content ...     | next   |              extension records
//! +--------+--------+--------+--------+
//! ```
//!
//! Flags: version (3 bits), protocol type, reserved, E (extension header),
//! S (sequence number), PN (N-PDU number). One 4-byte optional region is
//! shared by all three flags: it exists as soon as any of them is set.
//!
//! A G-PDU (message type 255) is a user-plane message carrying an IP packet
//! after the header. Every other message type is control plane, and its
//! information elements are part of this layer.

use tracing::trace;

use super::gtp_extension::{extension_chain_end, GtpExtension, GtpExtensions};
use super::{
    read_u16, read_u32, write_u16, write_u32, ComputeContext, OsiModelLayer, Protocol,
    ProtocolError, ProtocolType,
};
use crate::error::{Error, Result};
use crate::layer::{layer_view, DetachedLayer};

/// GTP-U (User Plane) UDP port.
pub const GTP_U_PORT: u16 = 2152;

/// GTP-C (Control Plane) UDP port.
pub const GTP_C_PORT: u16 = 2123;

/// Fixed GTPv1 header length.
pub const GTP_HEADER_LEN: usize = 8;

/// Sequence number, N-PDU number and next extension type.
pub const GTP_OPTIONAL_LEN: usize = 4;

const FLAG_E: u8 = 0x04;
const FLAG_S: u8 = 0x02;
const FLAG_PN: u8 = 0x01;
const OPTIONAL_FLAGS: u8 = FLAG_E | FLAG_S | FLAG_PN;

/// Name reported for message types missing from the table.
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";

/// GTP extension header types (3GPP TS 29.281).
pub mod extension_header_type {
    pub const NO_MORE: u8 = 0x00;
    pub const MBMS_SUPPORT_INDICATION: u8 = 0x01;
    pub const MS_INFO_CHANGE_REPORTING: u8 = 0x02;
    pub const SERVICE_CLASS_INDICATOR: u8 = 0x20;
    pub const UDP_PORT: u8 = 0x40;
    pub const RAN_CONTAINER: u8 = 0x81;
    pub const LONG_PDCP_PDU_NUMBER: u8 = 0x82;
    pub const XW_RAN_CONTAINER: u8 = 0x83;
    pub const NR_RAN_CONTAINER: u8 = 0x84;
    pub const PDU_SESSION_CONTAINER: u8 = 0x85;
    pub const PDCP_PDU_NUMBER: u8 = 0xC0;
}

/// Get the name of a GTP extension header type.
pub(crate) fn extension_header_type_name(ext_type: u8) -> &'static str {
    match ext_type {
        extension_header_type::NO_MORE => "No More",
        extension_header_type::MBMS_SUPPORT_INDICATION => "MBMS Support Indication",
        extension_header_type::MS_INFO_CHANGE_REPORTING => "MS Info Change Reporting",
        extension_header_type::SERVICE_CLASS_INDICATOR => "Service Class Indicator",
        extension_header_type::UDP_PORT => "UDP Port",
        extension_header_type::RAN_CONTAINER => "RAN Container",
        extension_header_type::LONG_PDCP_PDU_NUMBER => "Long PDCP PDU Number",
        extension_header_type::XW_RAN_CONTAINER => "Xw RAN Container",
        extension_header_type::NR_RAN_CONTAINER => "NR RAN Container",
        extension_header_type::PDU_SESSION_CONTAINER => "PDU Session Container",
        extension_header_type::PDCP_PDU_NUMBER => "PDCP PDU Number",
        _ => "Unknown",
    }
}

macro_rules! gtp_v1_message_types {
    ($($variant:ident = $value:literal => $name:literal,)+) => {
        /// GTPv1 message types (3GPP TS 29.060 section 7.1).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum GtpV1MessageType {
            /// Any value missing from the table.
            Unknown = 0,
            $($variant = $value,)+
        }

        impl GtpV1MessageType {
            pub fn from_u8(value: u8) -> Self {
                match value {
                    $($value => GtpV1MessageType::$variant,)+
                    _ => GtpV1MessageType::Unknown,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    GtpV1MessageType::Unknown => UNKNOWN_MESSAGE_TYPE,
                    $(GtpV1MessageType::$variant => $name,)+
                }
            }
        }
    };
}

gtp_v1_message_types! {
    EchoRequest = 1 => "Echo Request",
    EchoResponse = 2 => "Echo Response",
    VersionNotSupported = 3 => "Version Not Supported",
    NodeAliveRequest = 4 => "Node Alive Request",
    NodeAliveResponse = 5 => "Node Alive Response",
    RedirectionRequest = 6 => "Redirection Request",
    RedirectionResponse = 7 => "Redirection Response",
    CreatePdpContextRequest = 16 => "Create PDP Context Request",
    CreatePdpContextResponse = 17 => "Create PDP Context Response",
    UpdatePdpContextRequest = 18 => "Update PDP Context Request",
    UpdatePdpContextResponse = 19 => "Update PDP Context Response",
    DeletePdpContextRequest = 20 => "Delete PDP Context Request",
    DeletePdpContextResponse = 21 => "Delete PDP Context Response",
    InitiatePdpContextActivationRequest = 22 => "Initiate PDP Context Activation Request",
    InitiatePdpContextActivationResponse = 23 => "Initiate PDP Context Activation Response",
    ErrorIndication = 26 => "Error Indication",
    PduNotificationRequest = 27 => "PDU Notification Request",
    PduNotificationResponse = 28 => "PDU Notification Response",
    PduNotificationRejectRequest = 29 => "PDU Notification Reject Request",
    PduNotificationRejectResponse = 30 => "PDU Notification Reject Response",
    SupportedExtensionHeadersNotification = 31 => "Supported Extension Headers Notification",
    SendRoutingInfoForGprsRequest = 32 => "Send Routing for GPRS Request",
    SendRoutingInfoForGprsResponse = 33 => "Send Routing for GPRS Response",
    FailureReportRequest = 34 => "Failure Report Request",
    FailureReportResponse = 35 => "Failure Report Response",
    NoteMsPresentRequest = 36 => "Note MS Present Request",
    NoteMsPresentResponse = 37 => "Note MS Present Response",
    IdentificationRequest = 48 => "Identification Request",
    IdentificationResponse = 49 => "Identification Response",
    SgsnContextRequest = 50 => "SGSN Context Request",
    SgsnContextResponse = 51 => "SGSN Context Response",
    SgsnContextAcknowledge = 52 => "SGSN Context Acknowledge",
    ForwardRelocationRequest = 53 => "Forward Relocation Request",
    ForwardRelocationResponse = 54 => "Forward Relocation Response",
    ForwardRelocationComplete = 55 => "Forward Relocation Complete",
    RelocationCancelRequest = 56 => "Relocation Cancel Request",
    RelocationCancelResponse = 57 => "Relocation Cancel Response",
    ForwardSrnsContext = 58 => "Forward SRNS Context",
    ForwardRelocationCompleteAcknowledge = 59 => "Forward Relocation Complete Acknowledge",
    ForwardSrnsContextAcknowledge = 60 => "Forward SRNS Context Acknowledge",
    UeRegistrationRequest = 61 => "UE Registration Request",
    UeRegistrationResponse = 62 => "UE Registration Response",
    RanInformationRelay = 70 => "RAN Information Relay",
    MbmsNotificationRequest = 96 => "MBMS Notification Request",
    MbmsNotificationResponse = 97 => "MBMS Notification Response",
    MbmsNotificationRejectRequest = 98 => "MBMS Notification Reject Request",
    MbmsNotificationRejectResponse = 99 => "MBMS Notification Reject Response",
    CreateMbmsContextRequest = 100 => "Create MBMS Context Request",
    CreateMbmsContextResponse = 101 => "Create MBMS Context Response",
    UpdateMbmsContextRequest = 102 => "Update MBMS Context Request",
    UpdateMbmsContextResponse = 103 => "Update MBMS Context Response",
    DeleteMbmsContextRequest = 104 => "Delete MBMS Context Request",
    DeleteMbmsContextResponse = 105 => "Delete MBMS Context Response",
    MbmsRegistrationRequest = 112 => "MBMS Registration Request",
    MbmsRegistrationResponse = 113 => "MBMS Registration Response",
    MbmsDeRegistrationRequest = 114 => "MBMS De-Registration Request",
    MbmsDeRegistrationResponse = 115 => "MBMS De-Registration Response",
    MbmsSessionStartRequest = 116 => "MBMS Session Start Request",
    MbmsSessionStartResponse = 117 => "MBMS Session Start Response",
    MbmsSessionStopRequest = 118 => "MBMS Session Stop Request",
    MbmsSessionStopResponse = 119 => "MBMS Session Stop Response",
    MbmsSessionUpdateRequest = 120 => "MBMS Session Update Request",
    MbmsSessionUpdateResponse = 121 => "MBMS Session Update Response",
    MsInfoChangeRequest = 128 => "MS Info Change Request",
    MsInfoChangeResponse = 129 => "MS Info Change Response",
    DataRecordTransferRequest = 240 => "Data Record Transfer Request",
    DataRecordTransferResponse = 241 => "Data Record Transfer Response",
    EndMarker = 254 => "End Marker",
    GPdu = 255 => "G-PDU",
}

/// Decoded fixed GTPv1 header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GtpV1Header {
    pub version: u8,
    pub protocol_type: u8,
    pub reserved: u8,
    pub extension_flag: bool,
    pub sequence_number_flag: bool,
    pub npdu_number_flag: bool,
    pub message_type: u8,
    /// Bytes after the fixed 8-byte header.
    pub message_length: u16,
    pub teid: u32,
}

impl GtpV1Header {
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < GTP_HEADER_LEN {
            return None;
        }
        let flags = data[0];
        Some(Self {
            version: (flags >> 5) & 0x07,
            protocol_type: (flags >> 4) & 0x01,
            reserved: (flags >> 3) & 0x01,
            extension_flag: flags & FLAG_E != 0,
            sequence_number_flag: flags & FLAG_S != 0,
            npdu_number_flag: flags & FLAG_PN != 0,
            message_type: data[1],
            message_length: read_u16(data, 2),
            teid: read_u32(data, 4),
        })
    }

    pub fn encode(&self) -> [u8; GTP_HEADER_LEN] {
        let mut out = [0u8; GTP_HEADER_LEN];
        out[0] = (self.version & 0x07) << 5
            | (self.protocol_type & 0x01) << 4
            | (self.reserved & 0x01) << 3
            | if self.extension_flag { FLAG_E } else { 0 }
            | if self.sequence_number_flag { FLAG_S } else { 0 }
            | if self.npdu_number_flag { FLAG_PN } else { 0 };
        out[1] = self.message_type;
        write_u16(&mut out, 2, self.message_length);
        write_u32(&mut out, 4, self.teid);
        out
    }

    /// Whether the 4-byte optional region follows the fixed header.
    pub fn has_optional_region(&self) -> bool {
        self.extension_flag || self.sequence_number_flag || self.npdu_number_flag
    }

    pub fn is_user_plane(&self) -> bool {
        self.message_type == GtpV1MessageType::GPdu as u8
    }
}

/// GTPv1 protocol.
#[derive(Debug, Clone, Copy)]
pub struct GtpV1Protocol;

impl GtpV1Protocol {
    /// Whether `port` is a registered GTPv1 port.
    pub fn is_gtp_port(port: u16) -> bool {
        port == GTP_U_PORT || port == GTP_C_PORT
    }

    /// Whether `data` starts with a GTP version 1 header.
    pub fn is_gtp_v1(data: &[u8]) -> bool {
        data.len() >= GTP_HEADER_LEN && data[0] >> 5 == 1
    }

    pub(crate) fn is_user_plane(data: &[u8]) -> bool {
        data.get(1) == Some(&(GtpV1MessageType::GPdu as u8))
    }
}

impl Protocol for GtpV1Protocol {
    fn name(&self) -> &'static str {
        "gtpv1"
    }

    fn display_name(&self) -> &'static str {
        "GTPv1"
    }

    fn kind(&self) -> ProtocolType {
        ProtocolType::GtpV1
    }

    fn osi_layer(&self) -> OsiModelLayer {
        OsiModelLayer::Transport
    }

    fn header_len(&self, data: &[u8]) -> std::result::Result<usize, ProtocolError> {
        let header = GtpV1Header::decode(data)
            .ok_or_else(|| ProtocolError::too_short("gtpv1", GTP_HEADER_LEN, data.len()))?;
        if header.version != 1 {
            return Err(ProtocolError::InvalidField {
                protocol: "gtpv1",
                field: "version",
                reason: format!("expected 1, found {}", header.version),
            });
        }
        let base = if header.has_optional_region() {
            GTP_HEADER_LEN + GTP_OPTIONAL_LEN
        } else {
            GTP_HEADER_LEN
        };
        if data.len() < base {
            return Err(ProtocolError::too_short("gtpv1", base, data.len()));
        }
        if !header.is_user_plane() {
            // Control plane: information elements belong to the header.
            let declared = GTP_HEADER_LEN + usize::from(header.message_length);
            return Ok(declared.clamp(base, data.len()));
        }
        if !header.extension_flag {
            return Ok(base);
        }
        Ok(extension_chain_end(data).0)
    }

    fn next_layer(&self, data: &[u8], header_len: usize) -> Option<ProtocolType> {
        if !Self::is_user_plane(data) {
            return None;
        }
        match data.get(header_len)? >> 4 {
            4 => Some(ProtocolType::Ipv4),
            6 => Some(ProtocolType::Ipv6),
            _ => None,
        }
    }

    fn compute_fields(&self, cx: ComputeContext<'_>) {
        let length = cx.data.len().saturating_sub(GTP_HEADER_LEN);
        write_u16(cx.data, 2, u16::try_from(length).unwrap_or(u16::MAX));
    }

    fn summary(&self, data: &[u8]) -> String {
        let Some(header) = GtpV1Header::decode(data) else {
            return "GTP v1 Layer".to_string();
        };
        if header.is_user_plane() {
            format!("GTP v1 Layer, GTP-U message, TEID: {}", header.teid)
        } else {
            format!(
                "GTP v1 Layer, GTP-C message: {}, TEID: {}",
                GtpV1MessageType::from_u8(header.message_type).name(),
                header.teid
            )
        }
    }
}

layer_view!(
    /// GTPv1 view.
    ///
    /// Read accessors work on `GtpV1Layer<&Packet>` and
    /// `GtpV1Layer<&mut Packet>`; setters need the latter. Setters that grow
    /// the header shift every later layer in the same step.
    GtpV1Layer,
    ProtocolType::GtpV1
);

impl<P: std::ops::Deref<Target = crate::Packet>> GtpV1Layer<P> {
    pub fn header(&self) -> GtpV1Header {
        // Accepted by header_len, so the fixed header is there.
        GtpV1Header::decode(self.bytes()).unwrap_or_default()
    }

    pub fn teid(&self) -> u32 {
        self.header().teid
    }

    pub fn message_type(&self) -> GtpV1MessageType {
        GtpV1MessageType::from_u8(self.header().message_type)
    }

    pub fn message_type_name(&self) -> &'static str {
        self.message_type().name()
    }

    pub fn is_gtp_u_message(&self) -> bool {
        self.header().is_user_plane()
    }

    pub fn is_gtp_c_message(&self) -> bool {
        !self.is_gtp_u_message()
    }

    /// Sequence number, if the S flag is set.
    pub fn sequence_number(&self) -> Option<u16> {
        if !self.header().sequence_number_flag {
            return None;
        }
        let data = self.header_bytes();
        (data.len() >= GTP_HEADER_LEN + 2).then(|| read_u16(data, 8))
    }

    /// N-PDU number, if the PN flag is set.
    pub fn npdu_number(&self) -> Option<u8> {
        if !self.header().npdu_number_flag {
            return None;
        }
        self.header_bytes().get(10).copied()
    }

    /// Type of the first extension record, if the E flag is set.
    ///
    /// `Some(0)` means the flag is set but no record follows.
    pub fn next_extension_header_type(&self) -> Option<u8> {
        if !self.header().extension_flag {
            return None;
        }
        self.header_bytes().get(11).copied()
    }

    /// First extension record.
    pub fn next_extension(&self) -> Option<GtpExtension<'_>> {
        let ext_type = self.next_extension_header_type()?;
        if ext_type == extension_header_type::NO_MORE {
            return None;
        }
        let start = GTP_HEADER_LEN + GTP_OPTIONAL_LEN;
        GtpExtension::new(self.header_bytes().get(start..)?, ext_type)
    }

    pub fn extensions(&self) -> GtpExtensions<'_> {
        GtpExtensions::new(self.next_extension())
    }
}

impl<P: std::ops::DerefMut<Target = crate::Packet>> GtpV1Layer<P> {
    pub fn set_teid(&mut self, teid: u32) {
        write_u32(self.bytes_mut(), 4, teid);
    }

    /// Change the message type.
    ///
    /// A G-PDU carrying inner layers cannot become a control-plane message;
    /// remove the inner layers first.
    pub fn set_message_type(&mut self, message_type: GtpV1MessageType) -> Result<()> {
        if message_type != GtpV1MessageType::GPdu && self.next_layer().is_some() {
            return Err(Error::LayerConflict {
                reason: "GTP-C message cannot carry inner layers",
            });
        }
        self.bytes_mut()[1] = message_type as u8;
        Ok(())
    }

    /// Set the sequence number, adding the optional region if absent.
    pub fn set_sequence_number(&mut self, sequence: u16) -> Result<()> {
        self.ensure_optional_region()?;
        let data = self.bytes_mut();
        data[0] |= FLAG_S;
        write_u16(data, 8, sequence);
        Ok(())
    }

    /// Set the N-PDU number, adding the optional region if absent.
    pub fn set_npdu_number(&mut self, npdu: u8) -> Result<()> {
        self.ensure_optional_region()?;
        let data = self.bytes_mut();
        data[0] |= FLAG_PN;
        data[10] = npdu;
        Ok(())
    }

    /// Clear the S flag; the optional region goes away with the last flag.
    pub fn clear_sequence_number(&mut self) -> Result<()> {
        self.clear_optional_field(FLAG_S, 8..10)
    }

    /// Clear the PN flag; the optional region goes away with the last flag.
    pub fn clear_npdu_number(&mut self) -> Result<()> {
        self.clear_optional_field(FLAG_PN, 10..11)
    }

    /// Append an extension record with a 2-byte content at the end of the
    /// chain and link the previous record (or the optional region) to it.
    pub fn add_extension(&mut self, extension_type: u8, content: u16) -> Result<GtpExtension<'_>> {
        let content = content.to_be_bytes();
        let record = [1, content[0], content[1], extension_header_type::NO_MORE];
        let offset = self.offset();
        let header = self.header();

        let (record_at, link_at) = if !header.has_optional_region() {
            let mut bytes = [0u8; GTP_OPTIONAL_LEN + 4];
            bytes[GTP_OPTIONAL_LEN..].copy_from_slice(&record);
            self.grow(offset + GTP_HEADER_LEN, &bytes)?;
            (GTP_HEADER_LEN + GTP_OPTIONAL_LEN, GTP_HEADER_LEN + 3)
        } else {
            let (end, link) = if header.extension_flag {
                extension_chain_end(self.bytes())
            } else {
                (GTP_HEADER_LEN + GTP_OPTIONAL_LEN, GTP_HEADER_LEN + 3)
            };
            self.grow(offset + end, &record)?;
            (end, link)
        };

        let data = self.bytes_mut();
        data[0] |= FLAG_E;
        data[link_at] = extension_type;
        trace!(extension_type, offset = offset + record_at, "gtp extension added");

        let start = offset + record_at;
        let end = (offset + self.header_len()).max(start + record.len());
        Ok(GtpExtension::from_record(
            &self.packet.as_bytes()[start..end],
            extension_type,
        ))
    }

    fn ensure_optional_region(&mut self) -> Result<()> {
        if self.header().has_optional_region() {
            return Ok(());
        }
        let at = self.offset() + GTP_HEADER_LEN;
        self.grow(at, &[0u8; GTP_OPTIONAL_LEN])
    }

    fn clear_optional_field(&mut self, flag: u8, field: std::ops::Range<usize>) -> Result<()> {
        let flags = self.bytes()[0];
        if flags & flag == 0 {
            return Ok(());
        }
        if flags & OPTIONAL_FLAGS == flag {
            // Last user of the region: drop it together with the flag.
            let at = self.offset() + GTP_HEADER_LEN;
            let index = self.index;
            self.packet.shrink_layer(index, at, GTP_OPTIONAL_LEN)?;
            self.adjust_message_length(-(GTP_OPTIONAL_LEN as i32));
        } else {
            self.bytes_mut()[field].fill(0);
        }
        self.bytes_mut()[0] &= !flag;
        Ok(())
    }

    /// Insert header bytes and keep the message length in step, so a
    /// control-plane header keeps covering its information elements.
    fn grow(&mut self, at: usize, bytes: &[u8]) -> Result<()> {
        let index = self.index;
        self.packet.grow_layer(index, at, bytes)?;
        self.adjust_message_length(bytes.len() as i32);
        Ok(())
    }

    fn adjust_message_length(&mut self, delta: i32) {
        let data = self.bytes_mut();
        let length = i32::from(read_u16(data, 2)) + delta;
        write_u16(data, 2, length.clamp(0, i32::from(u16::MAX)) as u16);
    }
}

impl GtpV1Layer<&crate::Packet> {
    /// New GTPv1 header (version 1, protocol type GTP).
    ///
    /// The optional region is added when a sequence number or N-PDU number
    /// is given. The message length covers the header's own optional bytes
    /// until calculated fields run.
    pub fn build(
        message_type: GtpV1MessageType,
        teid: u32,
        sequence: Option<u16>,
        npdu: Option<u8>,
    ) -> DetachedLayer {
        let optional = sequence.is_some() || npdu.is_some();
        let header = GtpV1Header {
            version: 1,
            protocol_type: 1,
            reserved: 0,
            extension_flag: false,
            sequence_number_flag: sequence.is_some(),
            npdu_number_flag: npdu.is_some(),
            message_type: message_type as u8,
            message_length: if optional { GTP_OPTIONAL_LEN as u16 } else { 0 },
            teid,
        };
        let mut bytes = header.encode().to_vec();
        if optional {
            bytes.extend_from_slice(&sequence.unwrap_or(0).to_be_bytes());
            bytes.push(npdu.unwrap_or(0));
            bytes.push(extension_header_type::NO_MORE);
        }
        DetachedLayer::new(ProtocolType::GtpV1, bytes)
    }
}
