//! Default configuration shared by every monitor.

use crate::types::{Align, ObserveConfig};

/// Class names and settings applied when a monitor is created without them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Defaults {
    /// Class marking left-aligned text
    pub left_class: String,
    /// Class marking center-aligned text
    pub center_class: String,
    /// Class marking right-aligned text
    pub right_class: String,
    /// Alignment when a monitor does not name one
    pub align: Align,
    /// Change kinds a monitor listens for when it does not name them
    pub observe: ObserveConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            left_class: "text-l".to_string(),
            center_class: "text-m".to_string(),
            right_class: "text-r".to_string(),
            align: Align::Center,
            observe: ObserveConfig::default(),
        }
    }
}

impl Defaults {
    /// Class selector for the given alignment, e.g. `.text-m`.
    pub fn class_selector(&self, align: Align) -> String {
        let class = match align {
            Align::Left => &self.left_class,
            Align::Center => &self.center_class,
            Align::Right => &self.right_class,
        };
        format!(".{}", class)
    }

    /// Apply a partial override. Empty class names are ignored.
    pub fn apply(&mut self, patch: DefaultsPatch) {
        if let Some(class) = patch.left_class.filter(|c| !c.is_empty()) {
            self.left_class = class;
        }
        if let Some(class) = patch.center_class.filter(|c| !c.is_empty()) {
            self.center_class = class;
        }
        if let Some(class) = patch.right_class.filter(|c| !c.is_empty()) {
            self.right_class = class;
        }
        if let Some(align) = patch.align {
            self.align = align;
        }
        if let Some(observe) = patch.observe {
            self.observe = observe;
        }
    }
}

/// A partial update to [`Defaults`]; `None` fields keep their current value.
///
/// The `defaultLeftTextClass`-style keys used by older callers are accepted
/// as aliases.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct DefaultsPatch {
    #[cfg_attr(feature = "serde", serde(alias = "defaultLeftTextClass"))]
    pub left_class: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "defaultCenterTextClass"))]
    pub center_class: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "defaultRightTextClass"))]
    pub right_class: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "defaultAlign"))]
    pub align: Option<Align>,
    pub observe: Option<ObserveConfig>,
}
