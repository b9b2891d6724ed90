//! Engine orchestration
//!
//! This module provides the public stateful API for Synheart Moments. It wires
//! the metric simulator, trigger evaluator and session timer together and
//! exposes the two tick entry points plus the user actions.

use crate::catalog::MomentCatalog;
use crate::config::EngineConfig;
use crate::error::MomentError;
use crate::metrics::MetricSimulator;
use crate::session::{ActiveSession, SessionTimer};
use crate::trigger::TriggerEvaluator;
use crate::types::{CompletedRecord, HostContext, LiveMetrics, SessionEvent, SessionPhase};
use crate::view::{ViewEncoder, ViewSnapshot};
use log::debug;
use rand::Rng;

/// Stateful micro-moment engine.
///
/// Tick entry points:
/// 1. `tick_metrics` - jitter the gauges, then evaluate triggers
/// 2. `tick_second` - advance the active session by one second
pub struct MomentsEngine {
    config: EngineConfig,
    catalog: MomentCatalog,
    simulator: MetricSimulator,
    trigger: TriggerEvaluator,
    timer: SessionTimer,
    encoder: ViewEncoder,
    context: HostContext,
}

impl Default for MomentsEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        let catalog = MomentCatalog::builtin();
        Self::build(config, catalog)
    }
}

impl MomentsEngine {
    /// Create an engine with the default config and built-in catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine after validating `config` against `catalog`
    pub fn with_config(config: EngineConfig, catalog: MomentCatalog) -> Result<Self, MomentError> {
        config.validate_against(&catalog)?;
        Ok(Self::build(config, catalog))
    }

    fn build(config: EngineConfig, catalog: MomentCatalog) -> Self {
        Self {
            simulator: MetricSimulator::new(config.ranges, config.initial_metrics),
            trigger: TriggerEvaluator::new(&config),
            timer: SessionTimer::new(),
            encoder: ViewEncoder::new(),
            context: HostContext::default(),
            config,
            catalog,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MomentCatalog {
        &self.catalog
    }

    pub fn metrics(&self) -> &LiveMetrics {
        self.simulator.metrics()
    }

    /// Replace the gauges (clamped to their ranges)
    pub fn set_metrics(&mut self, metrics: LiveMetrics) {
        self.simulator.set_metrics(metrics);
    }

    pub fn phase(&self) -> SessionPhase {
        self.timer.phase()
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.timer.active()
    }

    pub fn history(&self) -> &[CompletedRecord] {
        self.timer.history()
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    /// Attach the host's user id and health payload. Neither is interpreted.
    pub fn set_context(&mut self, context: HostContext) {
        self.context = context;
    }

    /// Metric/trigger tick: jitter every gauge, then propose at most one moment
    pub fn tick_metrics<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<SessionEvent> {
        let metrics = self.simulator.tick(rng);
        debug!(
            "Metrics: hr={:.1} stress={:.1} focus={:.1} energy={:.1}",
            metrics.heart_rate, metrics.stress_level, metrics.focus_score, metrics.energy_level
        );
        self.evaluate_triggers()
    }

    /// Evaluate triggers against the current gauges without jittering them
    pub fn evaluate_triggers(&mut self) -> Option<SessionEvent> {
        let proposal = self
            .trigger
            .evaluate(self.simulator.metrics(), self.timer.is_active())?;

        let moment = self.catalog.get(&proposal.moment_id)?.clone();
        self.timer
            .propose(moment, proposal.origin, self.config.auto_start_delay_secs)
            .ok()
    }

    /// Session tick: advance the active session by one second
    pub fn tick_second(&mut self) -> Option<SessionEvent> {
        self.timer.tick()
    }

    /// "Start Now" on a catalog moment
    pub fn start_now(&mut self, moment_id: &str) -> Result<SessionEvent, MomentError> {
        let moment = self.catalog.require(moment_id)?.clone();
        self.timer.start_now(moment)
    }

    /// Start a proposed moment before its auto-start delay runs out
    pub fn accept(&mut self) -> Result<SessionEvent, MomentError> {
        self.timer.accept()
    }

    pub fn pause(&mut self) -> Result<SessionEvent, MomentError> {
        self.timer.pause()
    }

    pub fn resume(&mut self) -> Result<SessionEvent, MomentError> {
        self.timer.resume()
    }

    /// Finish early, recording the time spent so far
    pub fn complete(&mut self) -> Result<SessionEvent, MomentError> {
        self.timer.complete()
    }

    /// Skip the active session or dismiss a proposal
    pub fn skip(&mut self) -> Result<SessionEvent, MomentError> {
        self.timer.skip()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.encoder
            .encode(self.simulator.metrics(), &self.timer, &self.context)
    }

    pub fn snapshot_json(&self) -> Result<String, MomentError> {
        self.encoder
            .encode_to_json(self.simulator.metrics(), &self.timer, &self.context)
    }

    pub fn history_json(&self) -> Result<String, MomentError> {
        Ok(serde_json::to_string(self.timer.history())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ENERGY_BOOST_ID, STRESS_RELIEF_ID};
    use crate::types::SessionOrigin;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stressed() -> LiveMetrics {
        LiveMetrics {
            stress_level: 95.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_high_stress_proposes_within_one_tick() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(stressed());
        let mut rng = StdRng::seed_from_u64(3);

        let event = engine.tick_metrics(&mut rng).unwrap();
        assert!(matches!(
            event,
            SessionEvent::Proposed { ref moment_id, origin: SessionOrigin::StressTrigger, .. }
                if moment_id == STRESS_RELIEF_ID
        ));
        assert_eq!(engine.phase(), SessionPhase::Proposed);
    }

    #[test]
    fn test_low_energy_proposes_energy_boost() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(LiveMetrics {
            energy_level: 10.0,
            ..Default::default()
        });

        let event = engine.evaluate_triggers().unwrap();
        assert!(matches!(
            event,
            SessionEvent::Proposed { ref moment_id, .. } if moment_id == ENERGY_BOOST_ID
        ));
    }

    #[test]
    fn test_no_second_proposal_while_active() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(stressed());
        engine.evaluate_triggers().unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            assert!(engine.tick_metrics(&mut rng).is_none());
        }
        assert_eq!(engine.phase(), SessionPhase::Proposed);
    }

    #[test]
    fn test_proposal_auto_starts_then_completes() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(stressed());
        engine.evaluate_triggers().unwrap();

        let delay = engine.config().auto_start_delay_secs;
        for _ in 0..delay {
            engine.tick_second();
        }
        assert_eq!(engine.phase(), SessionPhase::Running);

        let mut completed = None;
        for _ in 0..120 {
            if let Some(event @ SessionEvent::Completed { .. }) = engine.tick_second() {
                completed = Some(event);
            }
        }
        match completed {
            Some(SessionEvent::Completed { record }) => {
                assert_eq!(record.actual_duration_secs, 120);
                assert_eq!(record.origin, SessionOrigin::StressTrigger);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_start_now_unknown_moment() {
        let mut engine = MomentsEngine::new();
        let err = engine.start_now("does-not-exist").unwrap_err();
        assert!(matches!(err, MomentError::UnknownMoment(_)));
        assert_eq!(engine.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_skip_then_retrigger() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(stressed());
        engine.evaluate_triggers().unwrap();
        engine.skip().unwrap();
        assert!(engine.history().is_empty());

        // Still stressed, so the next evaluation proposes again
        assert!(engine.evaluate_triggers().is_some());
    }

    #[test]
    fn test_metrics_bounded_over_long_run() {
        let mut engine = MomentsEngine::new();
        let mut rng = StdRng::seed_from_u64(11);
        let ranges = engine.config().ranges;

        for _ in 0..5_000 {
            engine.tick_metrics(&mut rng);
            engine.tick_second();
            assert!(ranges.contains(engine.metrics()));
            if let Some(session) = engine.active_session() {
                assert!(session.elapsed_secs <= session.moment.duration_secs);
            }
        }
        for record in engine.history() {
            assert!(record.actual_duration_secs <= record.moment.duration_secs);
        }
    }

    #[test]
    fn test_nan_metric_recovers_into_range() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(LiveMetrics {
            stress_level: f64::NAN,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(4);
        let ranges = engine.config().ranges;

        for _ in 0..10 {
            engine.tick_metrics(&mut rng);
            assert!(engine.metrics().stress_level.is_finite());
            assert!(ranges.contains(engine.metrics()));
        }
    }

    #[test]
    fn test_with_config_rejects_missing_trigger_moment() {
        let config = EngineConfig {
            energy_moment_id: "missing".to_string(),
            ..Default::default()
        };
        let result = MomentsEngine::with_config(config, MomentCatalog::builtin());
        assert!(matches!(result, Err(MomentError::UnknownMoment(_))));
    }

    #[test]
    fn test_snapshot_json_includes_context() {
        let mut engine = MomentsEngine::new();
        engine.set_context(HostContext {
            user_id: Some("u-42".to_string()),
            health_data: None,
        });
        engine.start_now("focus-reset").unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&engine.snapshot_json().unwrap()).unwrap();
        assert_eq!(value["phase"], "running");
        assert_eq!(value["session"]["moment_id"], "focus-reset");
        assert_eq!(value["context"]["user_id"], "u-42");
    }
}
