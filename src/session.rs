//! Session timer state machine
//!
//! Drives at most one active moment through its phases:
//!
//! ```text
//! Idle -> Proposed -> Running <-> Paused
//!   \________________^   |          |
//!                        v          v
//!                  Completed / Skipped -> Idle
//! ```
//!
//! Completed appends a [`CompletedRecord`] to the history; Skipped records
//! nothing. Both terminal states reset straight back to Idle.

use crate::error::MomentError;
use crate::types::{CompletedRecord, Moment, SessionEvent, SessionOrigin, SessionPhase};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single in-flight session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub moment: Moment,
    pub origin: SessionOrigin,
    /// Never `Idle`
    pub phase: SessionPhase,
    /// Seconds spent running, at most `moment.duration_secs`
    pub elapsed_secs: u32,
    /// Session ticks left before a proposal starts on its own
    pub auto_start_in_secs: u32,
    pub started_at: Option<DateTime<Utc>>,
}

impl ActiveSession {
    pub fn remaining_secs(&self) -> u32 {
        self.moment.duration_secs.saturating_sub(self.elapsed_secs)
    }
}

/// Owns the active session and the append-only completion history
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    session: Option<ActiveSession>,
    history: Vec<CompletedRecord>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::Idle)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &[CompletedRecord] {
        &self.history
    }

    /// Idle -> Proposed
    pub fn propose(
        &mut self,
        moment: Moment,
        origin: SessionOrigin,
        auto_start_delay_secs: u32,
    ) -> Result<SessionEvent, MomentError> {
        self.ensure_idle()?;

        info!(
            "Proposing moment '{}' ({:?}), auto-start in {}s",
            moment.id, origin, auto_start_delay_secs
        );

        let event = SessionEvent::Proposed {
            moment_id: moment.id.clone(),
            origin,
            auto_start_in_secs: auto_start_delay_secs,
        };

        self.session = Some(ActiveSession {
            moment,
            origin,
            phase: SessionPhase::Proposed,
            elapsed_secs: 0,
            auto_start_in_secs: auto_start_delay_secs,
            started_at: None,
        });

        Ok(event)
    }

    /// Idle -> Running ("Start Now")
    pub fn start_now(&mut self, moment: Moment) -> Result<SessionEvent, MomentError> {
        self.ensure_idle()?;

        let mut session = ActiveSession {
            moment,
            origin: SessionOrigin::Manual,
            phase: SessionPhase::Proposed,
            elapsed_secs: 0,
            auto_start_in_secs: 0,
            started_at: None,
        };
        let event = begin(&mut session);
        self.session = Some(session);

        Ok(event)
    }

    /// Proposed -> Running
    pub fn accept(&mut self) -> Result<SessionEvent, MomentError> {
        let session = self.expect_phase("start", &[SessionPhase::Proposed])?;
        Ok(begin(session))
    }

    /// Running -> Paused
    pub fn pause(&mut self) -> Result<SessionEvent, MomentError> {
        let session = self.expect_phase("pause", &[SessionPhase::Running])?;
        session.phase = SessionPhase::Paused;
        debug!("Paused '{}' at {}s", session.moment.id, session.elapsed_secs);

        Ok(SessionEvent::Paused {
            moment_id: session.moment.id.clone(),
            elapsed_secs: session.elapsed_secs,
        })
    }

    /// Paused -> Running
    pub fn resume(&mut self) -> Result<SessionEvent, MomentError> {
        let session = self.expect_phase("resume", &[SessionPhase::Paused])?;
        session.phase = SessionPhase::Running;
        debug!("Resumed '{}' at {}s", session.moment.id, session.elapsed_secs);

        Ok(SessionEvent::Resumed {
            moment_id: session.moment.id.clone(),
            elapsed_secs: session.elapsed_secs,
        })
    }

    /// Running/Paused -> Completed -> Idle, recording the elapsed time so far
    pub fn complete(&mut self) -> Result<SessionEvent, MomentError> {
        let phase = self.phase();
        if !matches!(phase, SessionPhase::Running | SessionPhase::Paused) {
            return Err(MomentError::InvalidTransition {
                action: "complete",
                phase,
            });
        }
        let session = self.session.take().ok_or(MomentError::InvalidTransition {
            action: "complete",
            phase,
        })?;
        Ok(self.record(session))
    }

    /// Proposed/Running/Paused -> Skipped -> Idle, recording nothing
    pub fn skip(&mut self) -> Result<SessionEvent, MomentError> {
        let session = self.session.take().ok_or(MomentError::InvalidTransition {
            action: "skip",
            phase: SessionPhase::Idle,
        })?;

        info!(
            "Skipped moment '{}' after {}s",
            session.moment.id, session.elapsed_secs
        );

        Ok(SessionEvent::Skipped {
            moment_id: session.moment.id,
            elapsed_secs: session.elapsed_secs,
        })
    }

    /// Advance by one second.
    ///
    /// Proposed counts down to auto-start; Running counts up and completes on
    /// reaching the nominal duration; Idle and Paused do nothing.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        let session = self.session.as_mut()?;

        match session.phase {
            SessionPhase::Proposed => {
                session.auto_start_in_secs = session.auto_start_in_secs.saturating_sub(1);
                if session.auto_start_in_secs == 0 {
                    Some(begin(session))
                } else {
                    None
                }
            }
            SessionPhase::Running => {
                session.elapsed_secs =
                    (session.elapsed_secs + 1).min(session.moment.duration_secs);
                if session.elapsed_secs < session.moment.duration_secs {
                    return None;
                }
                let finished = self.session.take()?;
                Some(self.record(finished))
            }
            SessionPhase::Paused | SessionPhase::Idle => None,
        }
    }

    fn ensure_idle(&self) -> Result<(), MomentError> {
        match &self.session {
            Some(active) => Err(MomentError::SessionActive(active.moment.id.clone())),
            None => Ok(()),
        }
    }

    fn expect_phase(
        &mut self,
        action: &'static str,
        allowed: &[SessionPhase],
    ) -> Result<&mut ActiveSession, MomentError> {
        let phase = self.phase();
        match self.session.as_mut() {
            Some(session) if allowed.contains(&session.phase) => Ok(session),
            _ => Err(MomentError::InvalidTransition { action, phase }),
        }
    }

    /// Append a finished session to the history. The session is already
    /// detached, so the timer is back to Idle.
    fn record(&mut self, session: ActiveSession) -> SessionEvent {
        let completed_at = Utc::now();
        let record = CompletedRecord {
            record_id: Uuid::new_v4().to_string(),
            actual_duration_secs: session.elapsed_secs.min(session.moment.duration_secs),
            origin: session.origin,
            started_at: session.started_at.unwrap_or(completed_at),
            completed_at,
            moment: session.moment,
        };

        info!(
            "Completed moment '{}' in {}s",
            record.moment.id, record.actual_duration_secs
        );

        self.history.push(record.clone());
        SessionEvent::Completed { record }
    }
}

/// Put a session into Running from a fresh start
fn begin(session: &mut ActiveSession) -> SessionEvent {
    session.phase = SessionPhase::Running;
    session.auto_start_in_secs = 0;
    session.elapsed_secs = 0;
    session.started_at = Some(Utc::now());

    info!(
        "Started moment '{}' ({:?}, {}s)",
        session.moment.id, session.origin, session.moment.duration_secs
    );

    SessionEvent::Started {
        moment_id: session.moment.id.clone(),
        origin: session.origin,
    }
}
