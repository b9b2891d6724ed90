//! Core types for the Synheart Moments engine
//!
//! This module defines the data structures shared by every stage of the engine:
//! moment templates, live metrics, session phases, completed records and the
//! events emitted on state changes.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Moment category (fixed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentCategory {
    Breathing,
    Stretch,
    Mindfulness,
    Energy,
}

impl MomentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MomentCategory::Breathing => "breathing",
            MomentCategory::Stretch => "stretch",
            MomentCategory::Mindfulness => "mindfulness",
            MomentCategory::Energy => "energy",
        }
    }
}

/// Display styling hints passed through to the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentStyle {
    /// Accent colour (CSS hex)
    pub accent: String,
    /// Icon name understood by the host
    pub icon: String,
}

/// A predefined short wellness exercise template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub id: String,
    pub category: MomentCategory,
    pub title: String,
    pub description: String,
    /// Nominal duration (seconds)
    pub duration_secs: u32,
    /// Human-readable description of what proposes this moment
    pub trigger_description: String,
    pub style: MomentStyle,
    /// Ordered instruction steps, spread evenly over the duration
    pub instructions: Vec<String>,
    pub benefit: String,
    /// Time of day the moment is suggested in the schedule list
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
}

impl Moment {
    /// Index of the instruction that should be shown at `elapsed_secs`.
    ///
    /// Returns `None` for a moment without instructions.
    pub fn instruction_index_at(&self, elapsed_secs: u32) -> Option<usize> {
        let steps = self.instructions.len();
        if steps == 0 {
            return None;
        }
        if self.duration_secs == 0 {
            return Some(0);
        }
        let index = (elapsed_secs as u64 * steps as u64) / self.duration_secs as u64;
        Some((index as usize).min(steps - 1))
    }
}

/// Four simulated biometric gauges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    /// Heart rate (bpm)
    pub heart_rate: f64,
    /// Stress level (0-100)
    pub stress_level: f64,
    /// Focus score (0-100)
    pub focus_score: f64,
    /// Energy level (0-100)
    pub energy_level: f64,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            heart_rate: 72.0,
            stress_level: 35.0,
            focus_score: 70.0,
            energy_level: 65.0,
        }
    }
}

/// Clamp range and jitter amplitude for a single gauge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    pub min: f64,
    pub max: f64,
    /// Largest absolute change applied per tick
    pub max_step: f64,
}

impl MetricBounds {
    pub const fn new(min: f64, max: f64, max_step: f64) -> Self {
        Self { min, max, max_step }
    }

    /// Clamp into `[min, max]`. NaN maps to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bounds for all four gauges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRanges {
    pub heart_rate: MetricBounds,
    pub stress_level: MetricBounds,
    pub focus_score: MetricBounds,
    pub energy_level: MetricBounds,
}

impl Default for MetricRanges {
    fn default() -> Self {
        Self {
            heart_rate: MetricBounds::new(55.0, 110.0, 3.0),
            stress_level: MetricBounds::new(0.0, 100.0, 5.0),
            focus_score: MetricBounds::new(0.0, 100.0, 4.0),
            energy_level: MetricBounds::new(0.0, 100.0, 4.0),
        }
    }
}

impl MetricRanges {
    /// Whether every gauge of `metrics` lies within its bounds
    pub fn contains(&self, metrics: &LiveMetrics) -> bool {
        self.heart_rate.contains(metrics.heart_rate)
            && self.stress_level.contains(metrics.stress_level)
            && self.focus_score.contains(metrics.focus_score)
            && self.energy_level.contains(metrics.energy_level)
    }
}

/// Observable phase of the session timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Proposed,
    Running,
    Paused,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Proposed => "proposed",
            SessionPhase::Running => "running",
            SessionPhase::Paused => "paused",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What brought a session into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    /// Stress rose above the alert threshold
    StressTrigger,
    /// Energy fell below the low threshold
    EnergyTrigger,
    /// User pressed "Start Now"
    Manual,
}

/// A finished session. Append-only history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRecord {
    pub record_id: String,
    pub moment: Moment,
    pub origin: SessionOrigin,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Seconds actually spent, never more than the nominal duration
    pub actual_duration_secs: u32,
}

/// State change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Proposed {
        moment_id: String,
        origin: SessionOrigin,
        auto_start_in_secs: u32,
    },
    Started {
        moment_id: String,
        origin: SessionOrigin,
    },
    Paused {
        moment_id: String,
        elapsed_secs: u32,
    },
    Resumed {
        moment_id: String,
        elapsed_secs: u32,
    },
    Completed {
        record: CompletedRecord,
    },
    Skipped {
        moment_id: String,
        elapsed_secs: u32,
    },
}

/// Host-supplied identity and health payload.
///
/// Neither value is interpreted; both are echoed into view snapshots so the
/// host can correlate them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_data: Option<serde_json::Value>,
}
