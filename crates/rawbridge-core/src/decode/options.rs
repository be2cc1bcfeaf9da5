//! Decode configuration.

use serde::{Deserialize, Serialize};

/// What to do when a native stage reports a nonzero status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop at the first failing stage and return a structured error.
    #[default]
    FailFast,
    /// Report the failure and keep running the remaining stages.
    BestEffort,
}

/// Options for a decode or export run.
///
/// The processing fields map onto LibRaw's parameter setters and are
/// applied to the session before the file is opened. `None` selects the
/// library default, which is re-applied on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub error_policy: ErrorPolicy,
    /// Demosaic algorithm (0 = linear, 1 = VNG, 2 = PPG, 3 = AHD, ...).
    pub demosaic: Option<i32>,
    /// Disable automatic brightness scaling.
    pub no_auto_bright: bool,
    /// Highlight recovery mode (0 = clip, 1 = unclip, 2 = blend, 3+ = rebuild).
    pub highlight: Option<i32>,
}

impl DecodeOptions {
    /// Options that keep going past native failures.
    pub fn best_effort() -> Self {
        Self {
            error_policy: ErrorPolicy::BestEffort,
            ..Self::default()
        }
    }

    pub fn is_fail_fast(&self) -> bool {
        self.error_policy == ErrorPolicy::FailFast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_fast() {
        let options = DecodeOptions::default();
        assert!(options.is_fail_fast());
        assert!(!options.no_auto_bright);
        assert_eq!(options.demosaic, None);
        assert_eq!(options.highlight, None);
    }

    #[test]
    fn test_best_effort() {
        let options = DecodeOptions::best_effort();
        assert_eq!(options.error_policy, ErrorPolicy::BestEffort);
        assert!(!options.is_fail_fast());
    }

    #[test]
    fn test_serde_fills_missing_fields() {
        let options: DecodeOptions =
            serde_json::from_str(r#"{"error_policy":"best_effort","demosaic":1}"#).unwrap();
        assert_eq!(options.error_policy, ErrorPolicy::BestEffort);
        assert_eq!(options.demosaic, Some(1));
        assert_eq!(options.highlight, None);
    }

    #[test]
    fn test_serde_roundtrip_demosaic() {
        let options = DecodeOptions {
            demosaic: Some(3),
            ..Default::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"error_policy\":\"fail_fast\""));

        let parsed: DecodeOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }
}
