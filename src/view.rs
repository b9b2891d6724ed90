//! View snapshot encoding
//!
//! Turns engine state into a flat, serializable snapshot the host UI renders
//! directly: gauges, countdown text, progress, the current instruction and a
//! summary of completed moments.

use crate::error::MomentError;
use crate::session::{ActiveSession, SessionTimer};
use crate::types::{
    CompletedRecord, HostContext, LiveMetrics, MomentCategory, SessionOrigin, SessionPhase,
};
use crate::{MOMENTS_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the screen needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub producer: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
    pub metrics: LiveMetrics,
    pub phase: SessionPhase,
    pub session: Option<SessionView>,
    pub history: HistorySummary,
    pub context: HostContext,
}

/// The active session as displayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub moment_id: String,
    pub title: String,
    pub category: MomentCategory,
    pub accent: String,
    pub icon: String,
    pub benefit: String,
    pub origin: SessionOrigin,
    pub duration_secs: u32,
    pub elapsed_secs: u32,
    pub remaining_secs: u32,
    /// Remaining time as `mm:ss`
    pub countdown: String,
    /// Fraction of the nominal duration done (0-1)
    pub progress: f64,
    pub instruction_index: Option<usize>,
    pub instruction: Option<String>,
    /// Only set while the session is a proposal
    pub auto_start_in_secs: Option<u32>,
}

/// Roll-up of the completion history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub completed_count: usize,
    pub total_secs: u64,
    pub last_completed_at_utc: Option<String>,
}

/// Snapshot encoder, stamped with a per-engine instance id
#[derive(Debug, Clone)]
pub struct ViewEncoder {
    instance_id: String,
}

impl Default for ViewEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(
        &self,
        metrics: &LiveMetrics,
        timer: &SessionTimer,
        context: &HostContext,
    ) -> ViewSnapshot {
        ViewSnapshot {
            producer: PRODUCER_NAME.to_string(),
            version: MOMENTS_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            computed_at_utc: Utc::now().to_rfc3339(),
            metrics: *metrics,
            phase: timer.phase(),
            session: timer.active().map(session_view),
            history: summarize(timer.history()),
            context: context.clone(),
        }
    }

    pub fn encode_to_json(
        &self,
        metrics: &LiveMetrics,
        timer: &SessionTimer,
        context: &HostContext,
    ) -> Result<String, MomentError> {
        let snapshot = self.encode(metrics, timer, context);
        serde_json::to_string(&snapshot).map_err(MomentError::from)
    }
}

fn session_view(session: &ActiveSession) -> SessionView {
    let moment = &session.moment;
    let remaining = session.remaining_secs();
    let progress = if moment.duration_secs == 0 {
        0.0
    } else {
        (session.elapsed_secs as f64 / moment.duration_secs as f64).clamp(0.0, 1.0)
    };
    let instruction_index = moment.instruction_index_at(session.elapsed_secs);

    SessionView {
        moment_id: moment.id.clone(),
        title: moment.title.clone(),
        category: moment.category,
        accent: moment.style.accent.clone(),
        icon: moment.style.icon.clone(),
        benefit: moment.benefit.clone(),
        origin: session.origin,
        duration_secs: moment.duration_secs,
        elapsed_secs: session.elapsed_secs,
        remaining_secs: remaining,
        countdown: format_countdown(remaining),
        progress,
        instruction_index,
        instruction: instruction_index.map(|i| moment.instructions[i].clone()),
        auto_start_in_secs: (session.phase == SessionPhase::Proposed)
            .then_some(session.auto_start_in_secs),
    }
}

fn summarize(history: &[CompletedRecord]) -> HistorySummary {
    HistorySummary {
        completed_count: history.len(),
        total_secs: history
            .iter()
            .map(|r| r.actual_duration_secs as u64)
            .sum(),
        last_completed_at_utc: history.last().map(|r| r.completed_at.to_rfc3339()),
    }
}

/// Format seconds as `mm:ss`
pub fn format_countdown(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
