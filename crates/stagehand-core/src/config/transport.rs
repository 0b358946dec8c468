//! Transport timing configuration
//!
//! The thresholds below are live-performance heuristics, not hard rules, so
//! every one of them can be tuned from the config file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// "Back" restarts the current song once it has played longer than this;
    /// below it, "back" goes to the previous song.
    /// Default: 2.0 s
    pub prev_restart_threshold_secs: f64,

    /// Wait after a song ends naturally before advancing to the next one.
    /// Any manual transport action during the wait cancels the advance.
    /// Default: 5.0 s
    pub auto_advance_grace_secs: f64,

    /// How long the master fades down before a song swap while playing.
    /// Default: 1.5 s
    pub fade_out_secs: f64,

    /// Time constant of the master fade-out curve.
    /// Default: 0.3 s
    pub fade_out_time_constant: f64,

    /// Exponential master fade-in after a swap.
    /// Default: 1.0 s
    pub fade_in_secs: f64,

    /// Time constant for channel gain/pan and master volume changes.
    /// Default: 0.05 s
    pub ramp_time_constant: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            prev_restart_threshold_secs: 2.0,
            auto_advance_grace_secs: 5.0,
            fade_out_secs: 1.5,
            fade_out_time_constant: 0.3,
            fade_in_secs: 1.0,
            ramp_time_constant: 0.05,
        }
    }
}

impl TransportConfig {
    /// Replace negative or non-finite values with their defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |value: f64, default: f64| if value.is_finite() && value >= 0.0 { value } else { default };
        Self {
            prev_restart_threshold_secs: pick(self.prev_restart_threshold_secs, defaults.prev_restart_threshold_secs),
            auto_advance_grace_secs: pick(self.auto_advance_grace_secs, defaults.auto_advance_grace_secs),
            fade_out_secs: pick(self.fade_out_secs, defaults.fade_out_secs),
            fade_out_time_constant: pick(self.fade_out_time_constant, defaults.fade_out_time_constant),
            fade_in_secs: pick(self.fade_in_secs, defaults.fade_in_secs),
            ramp_time_constant: pick(self.ramp_time_constant, defaults.ramp_time_constant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: TransportConfig = serde_yaml::from_str("fade_out_secs: 0.5\n").unwrap();
        assert_eq!(config.fade_out_secs, 0.5);
        assert_eq!(config.auto_advance_grace_secs, 5.0);
        assert_eq!(config.ramp_time_constant, 0.05);
    }

    #[test]
    fn test_sanitized_replaces_bad_values() {
        let config = TransportConfig {
            auto_advance_grace_secs: -1.0,
            fade_in_secs: f64::NAN,
            fade_out_secs: 0.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.auto_advance_grace_secs, 5.0);
        assert_eq!(config.fade_in_secs, 1.0);
        assert_eq!(config.fade_out_secs, 0.0);
    }
}
