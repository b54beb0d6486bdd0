//! JavaScript-facing option types.

use plumb_core::{Align, ObserveConfig, UnknownAlign};
use plumb_monitor::{Container, MonitorOptions};
use serde::{Deserialize, Serialize};

/// Constructor options for `SvgTextMonitor`, minus the container.
///
/// The container is an element or a selector string and is read separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorOptionsJs {
    /// Descendant selector for the text nodes to watch.
    #[serde(default)]
    pub selector: Option<String>,
    /// `"left"`, `"center"`, or `"right"`.
    #[serde(default)]
    pub align: Option<String>,
    /// MutationObserver-style change kinds.
    #[serde(default)]
    pub config: Option<ObserveConfig>,
}

impl MonitorOptionsJs {
    pub fn into_core(self, container: Container) -> Result<MonitorOptions, UnknownAlign> {
        let mut options = MonitorOptions::new(container);
        if let Some(selector) = self.selector {
            options = options.selector(selector);
        }
        if let Some(align) = self.align {
            options = options.align(align.parse::<Align>()?);
        }
        if let Some(config) = self.config {
            options = options.config(config);
        }
        Ok(options)
    }
}

/// Result of a `flush` call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReportJs {
    pub rounds: usize,
    pub dispatched: usize,
    pub repositioned: usize,
}

impl From<plumb_monitor::DispatchReport> for DispatchReportJs {
    fn from(report: plumb_monitor::DispatchReport) -> Self {
        Self {
            rounds: report.rounds,
            dispatched: report.dispatched,
            repositioned: report.repositioned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumb_core::NodeId;

    #[test]
    fn test_options_from_js_shape() {
        let js: MonitorOptionsJs = serde_json::from_str(
            r#"{ "selector": ".label", "align": "right", "config": { "childList": false } }"#,
        )
        .unwrap();

        let options = js.into_core(Container::Node(NodeId(3))).unwrap();
        assert_eq!(options.selector.as_deref(), Some(".label"));
        assert_eq!(options.align, Some(Align::Right));

        let config = options.config.unwrap();
        assert!(!config.child_list);
        assert!(config.character_data);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let js: MonitorOptionsJs = serde_json::from_str("{}").unwrap();
        let options = js.into_core(Container::Selector("#chart".to_string())).unwrap();

        assert_eq!(options.container, Container::Selector("#chart".to_string()));
        assert!(options.selector.is_none());
        assert!(options.align.is_none());
        assert!(options.config.is_none());
    }

    #[test]
    fn test_config_accepts_default_prefixed_keys() {
        let patch: plumb_core::DefaultsPatch =
            serde_json::from_str(r#"{ "defaultCenterTextClass": "mid", "defaultAlign": "right" }"#).unwrap();
        assert_eq!(patch.center_class.as_deref(), Some("mid"));
        assert_eq!(patch.align, Some(Align::Right));
        assert!(patch.left_class.is_none());
    }

    #[test]
    fn test_unknown_align_is_rejected() {
        let js = MonitorOptionsJs {
            align: Some("justify".to_string()),
            ..Default::default()
        };
        assert!(js.into_core(Container::Node(NodeId(0))).is_err());
    }
}
