//! Moment catalog
//!
//! Built-in moment templates plus validated loading of custom catalogs from JSON.
//! Moments are immutable once the catalog is built.

use crate::error::MomentError;
use crate::types::{Moment, MomentCategory, MomentStyle};
use chrono::NaiveTime;
use std::collections::HashSet;

/// Id of the built-in stress-relief moment
pub const STRESS_RELIEF_ID: &str = "box-breathing";

/// Id of the built-in energy-boost moment
pub const ENERGY_BOOST_ID: &str = "energy-stretch";

/// Ordered, validated collection of moment templates
#[derive(Debug, Clone)]
pub struct MomentCatalog {
    moments: Vec<Moment>,
}

impl Default for MomentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MomentCatalog {
    /// Catalog with the built-in moments
    pub fn builtin() -> Self {
        Self {
            moments: builtin_moments(),
        }
    }

    /// Build a catalog from custom moments, validating each entry
    pub fn new(moments: Vec<Moment>) -> Result<Self, MomentError> {
        validate_moments(&moments)?;
        Ok(Self { moments })
    }

    /// Parse a JSON array of moments
    pub fn from_json(json: &str) -> Result<Self, MomentError> {
        let moments: Vec<Moment> = serde_json::from_str(json)?;
        Self::new(moments)
    }

    pub fn to_json(&self) -> Result<String, MomentError> {
        Ok(serde_json::to_string(&self.moments)?)
    }

    pub fn get(&self, id: &str) -> Option<&Moment> {
        self.moments.iter().find(|m| m.id == id)
    }

    /// Look up a moment, failing with `UnknownMoment`
    pub fn require(&self, id: &str) -> Result<&Moment, MomentError> {
        self.get(id)
            .ok_or_else(|| MomentError::UnknownMoment(id.to_string()))
    }

    pub fn moments(&self) -> &[Moment] {
        &self.moments
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }
}

fn validate_moments(moments: &[Moment]) -> Result<(), MomentError> {
    let mut seen = HashSet::new();

    for moment in moments {
        if moment.id.trim().is_empty() {
            return Err(MomentError::InvalidMoment("moment id is empty".to_string()));
        }
        if !seen.insert(moment.id.as_str()) {
            return Err(MomentError::InvalidMoment(format!(
                "duplicate moment id '{}'",
                moment.id
            )));
        }
        if moment.duration_secs == 0 {
            return Err(MomentError::InvalidMoment(format!(
                "moment '{}' has zero duration",
                moment.id
            )));
        }
        if moment.instructions.is_empty() {
            return Err(MomentError::InvalidMoment(format!(
                "moment '{}' has no instructions",
                moment.id
            )));
        }
    }

    Ok(())
}

fn steps(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

fn builtin_moments() -> Vec<Moment> {
    vec![
        Moment {
            id: STRESS_RELIEF_ID.to_string(),
            category: MomentCategory::Breathing,
            title: "Box Breathing".to_string(),
            description: "A two-minute paced breathing cycle to settle your nervous system."
                .to_string(),
            duration_secs: 120,
            trigger_description: "Stress level above your alert threshold".to_string(),
            style: MomentStyle {
                accent: "#5B8DEF".to_string(),
                icon: "wind".to_string(),
            },
            instructions: steps(&[
                "Breathe in slowly for four counts",
                "Hold your breath for four counts",
                "Breathe out gently for four counts",
                "Hold empty for four counts, then repeat",
            ]),
            benefit: "Lowers heart rate and eases acute stress".to_string(),
            scheduled_time: NaiveTime::from_hms_opt(10, 30, 0),
        },
        Moment {
            id: ENERGY_BOOST_ID.to_string(),
            category: MomentCategory::Energy,
            title: "Energy Stretch".to_string(),
            description: "Ninety seconds of standing stretches to wake up your body."
                .to_string(),
            duration_secs: 90,
            trigger_description: "Energy level below your low threshold".to_string(),
            style: MomentStyle {
                accent: "#F5A623".to_string(),
                icon: "zap".to_string(),
            },
            instructions: steps(&[
                "Stand up and reach both arms overhead",
                "Lean slowly to the left, then to the right",
                "Roll your shoulders backwards ten times",
            ]),
            benefit: "Boosts circulation and alertness".to_string(),
            scheduled_time: NaiveTime::from_hms_opt(14, 0, 0),
        },
        Moment {
            id: "focus-reset".to_string(),
            category: MomentCategory::Mindfulness,
            title: "Focus Reset".to_string(),
            description: "One minute of single-point attention before your next task."
                .to_string(),
            duration_secs: 60,
            trigger_description: "Scheduled between deep-work blocks".to_string(),
            style: MomentStyle {
                accent: "#7ED321".to_string(),
                icon: "target".to_string(),
            },
            instructions: steps(&[
                "Close your eyes and notice five sounds",
                "Bring attention to the feeling of your breath",
            ]),
            benefit: "Clears residual attention from the last task".to_string(),
            scheduled_time: NaiveTime::from_hms_opt(11, 45, 0),
        },
        Moment {
            id: "neck-release".to_string(),
            category: MomentCategory::Stretch,
            title: "Neck Release".to_string(),
            description: "A short seated stretch for desk-bound shoulders.".to_string(),
            duration_secs: 45,
            trigger_description: "Scheduled after long screen sessions".to_string(),
            style: MomentStyle {
                accent: "#BD10E0".to_string(),
                icon: "user".to_string(),
            },
            instructions: steps(&[
                "Drop your right ear toward your right shoulder",
                "Switch sides and hold",
                "Tuck your chin and lengthen the back of your neck",
            ]),
            benefit: "Releases neck and upper-back tension".to_string(),
            scheduled_time: NaiveTime::from_hms_opt(16, 15, 0),
        },
    ]
}
