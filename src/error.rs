//! Error types for Synheart Moments

use thiserror::Error;

use crate::types::SessionPhase;

/// Errors that can occur while driving the moments engine
#[derive(Debug, Error)]
pub enum MomentError {
    #[error("Cannot {action} while session is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error("A session is already active: {0}")]
    SessionActive(String),

    #[error("Unknown moment: {0}")]
    UnknownMoment(String),

    #[error("Invalid moment definition: {0}")]
    InvalidMoment(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Engine runtime has stopped")]
    EngineStopped,

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
