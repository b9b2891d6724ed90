//! Trigger evaluation
//!
//! Inspects live metrics and proposes at most one moment per tick. Stress wins
//! over energy when both thresholds are crossed.

use crate::config::EngineConfig;
use crate::types::{LiveMetrics, SessionOrigin};

/// A moment suggested by a threshold crossing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub moment_id: String,
    pub origin: SessionOrigin,
}

/// Threshold rules for proposing moments
#[derive(Debug, Clone)]
pub struct TriggerEvaluator {
    stress_threshold: f64,
    energy_threshold: f64,
    stress_moment_id: String,
    energy_moment_id: String,
}

impl TriggerEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            stress_threshold: config.stress_threshold,
            energy_threshold: config.energy_threshold,
            stress_moment_id: config.stress_moment_id.clone(),
            energy_moment_id: config.energy_moment_id.clone(),
        }
    }

    /// Evaluate one tick. Nothing is proposed while a session is active.
    pub fn evaluate(&self, metrics: &LiveMetrics, session_active: bool) -> Option<Proposal> {
        if session_active {
            return None;
        }

        if metrics.stress_level > self.stress_threshold {
            Some(Proposal {
                moment_id: self.stress_moment_id.clone(),
                origin: SessionOrigin::StressTrigger,
            })
        } else if metrics.energy_level < self.energy_threshold {
            Some(Proposal {
                moment_id: self.energy_moment_id.clone(),
                origin: SessionOrigin::EnergyTrigger,
            })
        } else {
            None
        }
    }
}
