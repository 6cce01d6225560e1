//! Capture configuration shared by the engine and the CLI.

use serde::{Deserialize, Serialize};

/// What to do with a row whose connection-state code is not recognised.
///
/// Chosen once per deployment and carried in [`CaptureConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatePolicy {
    /// Drop the row and count it as malformed.
    #[default]
    DropRow,
    /// Keep the row and report its state as `Unknown`.
    ReportUnknown,
}

/// Settings applied to every capture call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Handling of out-of-range state codes.
    pub unknown_state: UnknownStatePolicy,
    /// Whether the Linux owner scan walks process directories in parallel.
    pub parallel_owner_scan: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            unknown_state: UnknownStatePolicy::DropRow,
            parallel_owner_scan: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_drops_unknown_states() {
        let config = CaptureConfig::default();
        assert_eq!(config.unknown_state, UnknownStatePolicy::DropRow);
        assert!(config.parallel_owner_scan);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{"unknown_state":"report_unknown"}"#).expect("parse");
        assert_eq!(config.unknown_state, UnknownStatePolicy::ReportUnknown);
        assert!(config.parallel_owner_scan);
    }
}
