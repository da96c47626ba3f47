//! Federation configuration.
//!
//! One config struct drives readiness, privacy, and round-lease behavior.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for the aggregation core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Minimum distinct devices required before a round may start
    pub min_devices: usize,
    /// Trailing window (seconds) for the readiness check
    pub readiness_window_secs: i64,
    /// Privacy budget for per-update noise (smaller = more noise)
    pub epsilon: f64,
    /// Maximum influence of a single record, calibrates noise scale
    pub sensitivity: f64,
    /// Optional L2 clipping threshold applied before noising
    pub clipping_threshold: Option<f32>,
    /// Lease lifetime (seconds) for an in-progress round; rounds whose
    /// lease has expired are treated as crashed by the recovery sweep
    pub lease_ttl_secs: i64,
}

impl FederationConfig {
    /// Create a config with the given readiness threshold, keeping the
    /// default privacy and lease parameters.
    pub fn with_min_devices(min_devices: usize) -> Self {
        Self {
            min_devices,
            ..Default::default()
        }
    }

    /// Create a config with an effectively disabled noise mechanism.
    ///
    /// Useful for deployments that layer privacy elsewhere and for
    /// deterministic aggregation checks.
    pub fn without_noise() -> Self {
        Self {
            epsilon: f64::MAX,
            clipping_threshold: None,
            ..Default::default()
        }
    }

    /// Readiness window as a chrono duration.
    pub fn readiness_window(&self) -> Duration {
        Duration::seconds(self.readiness_window_secs)
    }

    /// Round lease lifetime as a chrono duration.
    pub fn lease_ttl(&self) -> Duration {
        Duration::seconds(self.lease_ttl_secs)
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            min_devices: 3,
            readiness_window_secs: 24 * 60 * 60,
            epsilon: 1.0,
            sensitivity: 1.0,
            clipping_threshold: Some(1.0),
            lease_ttl_secs: 15 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FederationConfig::default();
        assert_eq!(config.min_devices, 3);
        assert_eq!(config.readiness_window(), Duration::hours(24));
        assert!(config.epsilon > 0.0);
    }

    #[test]
    fn test_with_min_devices() {
        let config = FederationConfig::with_min_devices(5);
        assert_eq!(config.min_devices, 5);
        assert_eq!(config.lease_ttl(), Duration::minutes(15));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = FederationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: FederationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.min_devices, config.min_devices);
        assert_eq!(parsed.epsilon, config.epsilon);
    }
}
