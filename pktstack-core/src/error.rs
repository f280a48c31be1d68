//! Error types for pktstack-core.
//!
//! - [`enum@Error`] - Main error enum returned by every fallible mutation
//! - [`ProtocolError`] - Header-level parse failures, carried by
//!   [`Error::MalformedHeader`]
//!
//! Parsing a packet never fails: a header that cannot be read ends the layer
//! chain and the remaining bytes stay with the previous layer. Errors are only
//! surfaced by operations that change the buffer, and those operations leave
//! the packet untouched when they fail.

use thiserror::Error;

/// Main error type for pktstack-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer offset or length outside the current data.
    #[error("offset {offset} (+{count}) out of range for buffer of {len} bytes")]
    OutOfRange {
        offset: usize,
        count: usize,
        len: usize,
    },

    /// A layer handle or insertion point no longer matches the packet.
    #[error("layer conflict: {reason}")]
    LayerConflict { reason: &'static str },

    /// Header bytes inconsistent with the protocol they claim to be.
    #[error("malformed header: {0}")]
    MalformedHeader(#[from] ProtocolError),
}

/// Errors related to protocol header decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet too short for protocol header
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    PacketTooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// Invalid header field value
    #[error("{protocol}: invalid {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn too_short(protocol: &'static str, needed: usize, have: usize) -> Self {
        ProtocolError::PacketTooShort {
            protocol,
            needed,
            have,
        }
    }
}

/// Result type alias for pktstack-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_wraps_as_malformed_header() {
        let err: Error = ProtocolError::too_short("gtpv1", 8, 3).into();
        assert!(matches!(err, Error::MalformedHeader(_)));
        assert_eq!(
            err.to_string(),
            "malformed header: gtpv1: packet too short (need 8 bytes, have 3)"
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = Error::OutOfRange {
            offset: 10,
            count: 4,
            len: 12,
        };
        assert_eq!(
            err.to_string(),
            "offset 10 (+4) out of range for buffer of 12 bytes"
        );
    }
}
