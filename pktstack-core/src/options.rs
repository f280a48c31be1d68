//! Parse configuration.

use crate::protocol::{OsiModelLayer, ProtocolType};

/// Default cap on the number of layers parsed from one frame.
pub const DEFAULT_MAX_LAYERS: usize = 32;

/// Controls how far [`Packet`](crate::Packet) parsing descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Stop after the first layer matching this kind or category.
    pub parse_until: Option<ProtocolType>,
    /// Stop after the first layer at or above this OSI layer.
    pub parse_until_osi: Option<OsiModelLayer>,
    /// Upper bound on parsed layers. A packet trailer is not counted.
    pub max_layers: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_until: None,
            parse_until_osi: None,
            max_layers: DEFAULT_MAX_LAYERS,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_until(mut self, kind: ProtocolType) -> Self {
        self.parse_until = Some(kind);
        self
    }

    pub fn parse_until_osi(mut self, layer: OsiModelLayer) -> Self {
        self.parse_until_osi = Some(layer);
        self
    }

    pub fn max_layers(mut self, max: usize) -> Self {
        self.max_layers = max;
        self
    }

    /// Whether parsing ends once a layer of `kind` at `osi` has been added.
    pub(crate) fn stops_after(&self, kind: ProtocolType, osi: OsiModelLayer) -> bool {
        self.parse_until.is_some_and(|until| until.contains(kind))
            || self.parse_until_osi.is_some_and(|limit| osi >= limit)
    }
}
