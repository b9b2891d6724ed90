//! Engine configuration
//!
//! Thresholds, cadences and metric bounds. Serializable to JSON so hosts can
//! ship a config file alongside the app.

use crate::catalog::{MomentCatalog, ENERGY_BOOST_ID, STRESS_RELIEF_ID};
use crate::error::MomentError;
use crate::types::{LiveMetrics, MetricBounds, MetricRanges};
use serde::{Deserialize, Serialize};

/// Default metric/trigger tick interval in seconds
pub const DEFAULT_METRIC_TICK_SECS: u64 = 3;

/// Longest accepted metric tick interval (one hour)
pub const MAX_METRIC_TICK_SECS: u64 = 3600;

/// Default delay before a proposed moment starts on its own
pub const DEFAULT_AUTO_START_DELAY_SECS: u32 = 10;

/// Configuration for a [`crate::engine::MomentsEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between metric simulation + trigger evaluation ticks
    pub metric_tick_secs: u64,
    /// Session ticks a proposal waits before auto-starting
    pub auto_start_delay_secs: u32,
    /// Stress strictly above this proposes the stress-relief moment
    pub stress_threshold: f64,
    /// Energy strictly below this proposes the energy-boost moment
    pub energy_threshold: f64,
    pub stress_moment_id: String,
    pub energy_moment_id: String,
    pub ranges: MetricRanges,
    pub initial_metrics: LiveMetrics,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metric_tick_secs: DEFAULT_METRIC_TICK_SECS,
            auto_start_delay_secs: DEFAULT_AUTO_START_DELAY_SECS,
            stress_threshold: 70.0,
            energy_threshold: 30.0,
            stress_moment_id: STRESS_RELIEF_ID.to_string(),
            energy_moment_id: ENERGY_BOOST_ID.to_string(),
            ranges: MetricRanges::default(),
            initial_metrics: LiveMetrics::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, MomentError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, MomentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check internal consistency (bounds, thresholds, cadence)
    pub fn validate(&self) -> Result<(), MomentError> {
        if self.metric_tick_secs == 0 || self.metric_tick_secs > MAX_METRIC_TICK_SECS {
            return Err(MomentError::InvalidConfig(format!(
                "metric_tick_secs must be between 1 and {MAX_METRIC_TICK_SECS}"
            )));
        }

        // A zero delay would still wait one session tick before starting
        if self.auto_start_delay_secs == 0 {
            return Err(MomentError::InvalidConfig(
                "auto_start_delay_secs must be greater than zero".to_string(),
            ));
        }

        check_bounds("heart_rate", &self.ranges.heart_rate)?;
        check_bounds("stress_level", &self.ranges.stress_level)?;
        check_bounds("focus_score", &self.ranges.focus_score)?;
        check_bounds("energy_level", &self.ranges.energy_level)?;

        if !self.ranges.contains(&self.initial_metrics) {
            return Err(MomentError::InvalidConfig(
                "initial_metrics fall outside their ranges".to_string(),
            ));
        }

        if !self.stress_threshold.is_finite() || !self.energy_threshold.is_finite() {
            return Err(MomentError::InvalidConfig(
                "thresholds must be finite".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that the trigger moments exist in `catalog`
    pub fn validate_against(&self, catalog: &MomentCatalog) -> Result<(), MomentError> {
        self.validate()?;
        catalog.require(&self.stress_moment_id)?;
        catalog.require(&self.energy_moment_id)?;
        Ok(())
    }
}

fn check_bounds(name: &str, bounds: &MetricBounds) -> Result<(), MomentError> {
    if !(bounds.min.is_finite() && bounds.max.is_finite() && bounds.max_step.is_finite()) {
        return Err(MomentError::InvalidConfig(format!(
            "{name} bounds must be finite"
        )));
    }
    if bounds.min >= bounds.max {
        return Err(MomentError::InvalidConfig(format!(
            "{name} min must be below max"
        )));
    }
    if bounds.max_step < 0.0 {
        return Err(MomentError::InvalidConfig(format!(
            "{name} max_step must not be negative"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate_against(&MomentCatalog::builtin()).is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"stress_threshold": 80.0}"#).unwrap();
        assert_eq!(config.stress_threshold, 80.0);
        assert_eq!(config.energy_threshold, 30.0);
        assert_eq!(config.auto_start_delay_secs, DEFAULT_AUTO_START_DELAY_SECS);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_tick() {
        let result = EngineConfig::from_json(r#"{"metric_tick_secs": 0}"#);
        assert!(matches!(result, Err(MomentError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_oversized_tick() {
        let result = EngineConfig::from_json(r#"{"metric_tick_secs": 18446744073709551615}"#);
        assert!(matches!(result, Err(MomentError::InvalidConfig(_))));

        let config = EngineConfig {
            metric_tick_secs: MAX_METRIC_TICK_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_auto_start_delay() {
        let result = EngineConfig::from_json(r#"{"auto_start_delay_secs": 0}"#);
        assert!(matches!(result, Err(MomentError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut config = EngineConfig::default();
        config.ranges.focus_score = MetricBounds::new(100.0, 0.0, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_initial_metrics_out_of_range() {
        let mut config = EngineConfig::default();
        config.initial_metrics.heart_rate = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_trigger_moment() {
        let config = EngineConfig {
            stress_moment_id: "missing".to_string(),
            ..Default::default()
        };
        let err = config
            .validate_against(&MomentCatalog::builtin())
            .unwrap_err();
        assert!(matches!(err, MomentError::UnknownMoment(_)));
    }
}
