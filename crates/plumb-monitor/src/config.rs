//! Loading defaults from JSON.

use plumb_core::{Defaults, DefaultsPatch};
use thiserror::Error;

/// Errors while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid defaults JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a complete set of defaults; missing fields take built-in values.
pub fn defaults_from_json(json: &str) -> Result<Defaults, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a partial override, as accepted by `Monitor::configure_defaults`.
pub fn patch_from_json(json: &str) -> Result<DefaultsPatch, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plumb_core::Align;

    #[test]
    fn test_defaults_from_json_fills_missing_fields() {
        let defaults = defaults_from_json(r#"{ "centerClass": "mid", "align": "right" }"#).unwrap();
        assert_eq!(defaults.center_class, "mid");
        assert_eq!(defaults.left_class, "text-l");
        assert_eq!(defaults.align, Align::Right);
        assert!(defaults.observe.subtree);
    }

    #[test]
    fn test_patch_from_json() {
        let patch = patch_from_json(r#"{ "observe": { "subtree": false } }"#).unwrap();
        let observe = patch.observe.unwrap();
        assert!(!observe.subtree);
        assert!(observe.attributes);
        assert!(patch.align.is_none());
    }

    #[test]
    fn test_patch_accepts_legacy_keys() {
        let patch = patch_from_json(
            r#"{ "defaultLeftTextClass": "lo", "defaultCenterTextClass": "mid",
                 "defaultRightTextClass": "hi", "defaultAlign": "right" }"#,
        )
        .unwrap();

        let mut defaults = Defaults::default();
        defaults.apply(patch);
        assert_eq!(defaults.class_selector(Align::Left), ".lo");
        assert_eq!(defaults.class_selector(Align::Center), ".mid");
        assert_eq!(defaults.class_selector(Align::Right), ".hi");
        assert_eq!(defaults.align, Align::Right);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(patch_from_json("{ align: 1 }"), Err(ConfigError::Json(_))));
        assert!(defaults_from_json(r#"{ "align": "diagonal" }"#).is_err());
    }
}
