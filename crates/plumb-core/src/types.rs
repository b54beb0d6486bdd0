//! Core value types for the realignment engine.

use std::fmt;
use std::str::FromStr;

/// Attribute holding the positional encoding of a text node.
pub const TRANSFORM_ATTR: &str = "transform";

/// Attribute marking a container with the id of the monitor that owns it.
pub const MONITOR_ID_ATTR: &str = "_monitor_id";

/// Attribute marking a watched node with its subscription id.
pub const OBSERVER_ID_ATTR: &str = "_observer_id";

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

id_type!(
    /// Stable identity of an element inside a host document.
    NodeId
);

id_type!(
    /// Identity of one subscription (one watched node).
    SubscriptionId
);

id_type!(
    /// Owner id grouping subscriptions under one monitor.
    MonitorId
);

/// Horizontal alignment of a text node against its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Align {
    /// Growth extends rightward from a fixed left edge
    Left,
    /// Growth is split evenly around a fixed center
    #[default]
    Center,
    /// Growth extends leftward from a fixed right edge
    Right,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Align {
    type Err = crate::errors::UnknownAlign;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "center" | "middle" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            _ => Err(crate::errors::UnknownAlign(s.to_string())),
        }
    }
}

/// Which positional grammar a node's encoding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EncodingKind {
    /// `translate(x y)`
    Translate,
    /// `matrix(a, b, c, d, x, y)`
    Matrix,
}

impl EncodingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingKind::Translate => "translate",
            EncodingKind::Matrix => "matrix",
        }
    }
}

/// Which kinds of change a subscription listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct ObserveConfig {
    pub attributes: bool,
    pub character_data: bool,
    pub child_list: bool,
    pub subtree: bool,
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            attributes: true,
            character_data: true,
            child_list: true,
            subtree: true,
        }
    }
}

impl ObserveConfig {
    /// True if no change kind is selected.
    pub fn is_empty(&self) -> bool {
        !(self.attributes || self.character_data || self.child_list)
    }
}

/// Last-known-good offset and width a node's next change is diffed against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Baseline {
    pub offset_x: f64,
    pub offset_y: f64,
    /// Rendered content width; 0 means not yet measured
    pub width: f64,
}

impl Baseline {
    pub fn new(offset_x: f64, offset_y: f64, width: f64) -> Self {
        Self { offset_x, offset_y, width }
    }

    /// True once a non-zero width has been recorded.
    pub fn is_measured(&self) -> bool {
        self.width != 0.0
    }
}
