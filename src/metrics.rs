//! Metric simulation
//!
//! Perturbs the four live gauges by a small signed random delta each tick and
//! clamps them to their configured bounds. Purely cosmetic: there is no sensor
//! behind these values.

use crate::types::{LiveMetrics, MetricBounds, MetricRanges};
use rand::Rng;

/// Random-walk simulator for [`LiveMetrics`]
#[derive(Debug, Clone)]
pub struct MetricSimulator {
    ranges: MetricRanges,
    metrics: LiveMetrics,
}

impl MetricSimulator {
    /// Create a simulator starting at `initial`, clamped into `ranges`.
    ///
    /// `ranges` must already have passed [`crate::config::EngineConfig::validate`].
    pub(crate) fn new(ranges: MetricRanges, initial: LiveMetrics) -> Self {
        let metrics = LiveMetrics {
            heart_rate: ranges.heart_rate.clamp(initial.heart_rate),
            stress_level: ranges.stress_level.clamp(initial.stress_level),
            focus_score: ranges.focus_score.clamp(initial.focus_score),
            energy_level: ranges.energy_level.clamp(initial.energy_level),
        };
        Self { ranges, metrics }
    }

    pub fn metrics(&self) -> &LiveMetrics {
        &self.metrics
    }

    pub fn ranges(&self) -> &MetricRanges {
        &self.ranges
    }

    /// Overwrite the current values (clamped). Used by hosts that replay a
    /// recorded state and by tests.
    pub fn set_metrics(&mut self, metrics: LiveMetrics) {
        *self = Self::new(self.ranges, metrics);
    }

    /// Apply one jitter step to every gauge and return the new values
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> LiveMetrics {
        let ranges = self.ranges;
        let m = &mut self.metrics;

        m.heart_rate = jitter(rng, m.heart_rate, &ranges.heart_rate);
        m.stress_level = jitter(rng, m.stress_level, &ranges.stress_level);
        m.focus_score = jitter(rng, m.focus_score, &ranges.focus_score);
        m.energy_level = jitter(rng, m.energy_level, &ranges.energy_level);

        *m
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, value: f64, bounds: &MetricBounds) -> f64 {
    if !bounds.max_step.is_finite() || bounds.max_step <= 0.0 {
        return bounds.clamp(value);
    }
    let delta = rng.gen_range(-bounds.max_step..=bounds.max_step);
    bounds.clamp(value + delta)
}
