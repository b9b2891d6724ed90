//! Async runtime driver
//!
//! Runs a [`MomentsEngine`] inside a single tokio task with two periodic timers
//! (metric/trigger tick and session-second tick). User actions arrive over a
//! command channel and are serialised with the timer callbacks, so the engine is
//! never touched concurrently. Each loop iteration publishes a fresh snapshot
//! on a watch channel; state changes are forwarded as [`SessionEvent`]s.

use crate::engine::MomentsEngine;
use crate::error::MomentError;
use crate::types::{HostContext, SessionEvent};
use crate::view::ViewSnapshot;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// User action sent to a running engine
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartNow(String),
    Accept,
    Pause,
    Resume,
    Complete,
    Skip,
    SetContext(HostContext),
}

type Reply = Result<Option<SessionEvent>, MomentError>;

struct Request {
    command: Command,
    reply: oneshot::Sender<Reply>,
}

/// Handle to an engine running on the tokio runtime
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Request>,
    snapshots: watch::Receiver<ViewSnapshot>,
    task: JoinHandle<MomentsEngine>,
}

/// Spawn `engine` onto the current tokio runtime.
///
/// `seed` makes the metric jitter reproducible; `None` seeds from entropy.
/// Returns the handle and the stream of session events.
pub fn spawn_engine(
    engine: MomentsEngine,
    seed: Option<u64>,
) -> (EngineHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

    let task = tokio::spawn(drive(engine, rng, command_rx, snapshot_tx, event_tx));

    let handle = EngineHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        task,
    };
    (handle, event_rx)
}

impl EngineHandle {
    /// Apply a user action and wait for its outcome
    pub async fn send(&self, command: Command) -> Result<Option<SessionEvent>, MomentError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Request {
                command,
                reply: reply_tx,
            })
            .map_err(|_| MomentError::EngineStopped)?;
        reply_rx.await.map_err(|_| MomentError::EngineStopped)?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }

    /// Stop both timers and hand the engine back
    pub async fn shutdown(self) -> Result<MomentsEngine, MomentError> {
        drop(self.commands);
        self.task.await.map_err(|_| MomentError::EngineStopped)
    }
}

async fn drive(
    mut engine: MomentsEngine,
    mut rng: StdRng,
    mut commands: mpsc::UnboundedReceiver<Request>,
    snapshots: watch::Sender<ViewSnapshot>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> MomentsEngine {
    let metric_period = Duration::from_secs(engine.config().metric_tick_secs);
    let mut metric_tick = time::interval_at(time::Instant::now() + metric_period, metric_period);
    let second = Duration::from_secs(1);
    let mut session_tick = time::interval_at(time::Instant::now() + second, second);
    metric_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    session_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Engine runtime started (metric tick {}s)",
        metric_period.as_secs()
    );

    loop {
        let event = tokio::select! {
            _ = metric_tick.tick() => engine.tick_metrics(&mut rng),
            _ = session_tick.tick() => engine.tick_second(),
            request = commands.recv() => match request {
                Some(Request { command, reply }) => {
                    let result = apply(&mut engine, command);
                    if let Err(e) = &result {
                        warn!("Command rejected: {}", e);
                    }
                    let event = result.as_ref().ok().cloned().flatten();
                    let _ = reply.send(result);
                    event
                }
                None => break,
            },
        };

        if let Some(event) = event {
            let _ = events.send(event);
        }
        snapshots.send_replace(engine.snapshot());
    }

    info!("Engine runtime stopped, timers cleared");
    engine
}

fn apply(engine: &mut MomentsEngine, command: Command) -> Reply {
    let event = match command {
        Command::StartNow(id) => engine.start_now(&id)?,
        Command::Accept => engine.accept()?,
        Command::Pause => engine.pause()?,
        Command::Resume => engine.resume()?,
        Command::Complete => engine.complete()?,
        Command::Skip => engine.skip()?,
        Command::SetContext(context) => {
            engine.set_context(context);
            return Ok(None);
        }
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LiveMetrics, SessionPhase};

    async fn wait_for_completion(
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> SessionEvent {
        loop {
            match events.recv().await {
                Some(event @ SessionEvent::Completed { .. }) => return event,
                Some(_) => continue,
                None => panic!("event stream closed before completion"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_session_completes_on_timer() {
        let (handle, mut events) = spawn_engine(MomentsEngine::new(), Some(1));

        let started = handle
            .send(Command::StartNow("neck-release".to_string()))
            .await
            .unwrap();
        assert!(matches!(started, Some(SessionEvent::Started { .. })));

        match wait_for_completion(&mut events).await {
            SessionEvent::Completed { record } => {
                assert_eq!(record.moment.id, "neck-release");
                assert_eq!(record.actual_duration_secs, 45);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_session_does_not_advance() {
        let (handle, _events) = spawn_engine(MomentsEngine::new(), Some(2));

        handle
            .send(Command::StartNow("focus-reset".to_string()))
            .await
            .unwrap();
        time::sleep(Duration::from_millis(5_500)).await;
        handle.send(Command::Pause).await.unwrap();

        let paused_at = handle.snapshot().session.unwrap().elapsed_secs;
        assert_eq!(paused_at, 5);

        time::sleep(Duration::from_secs(120)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Paused);
        assert_eq!(snapshot.session.unwrap().elapsed_secs, paused_at);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stress_proposal_auto_starts() {
        let mut engine = MomentsEngine::new();
        engine.set_metrics(LiveMetrics {
            stress_level: 100.0,
            ..Default::default()
        });
        let delay = engine.config().auto_start_delay_secs;
        let (handle, mut events) = spawn_engine(engine, Some(3));

        match events.recv().await {
            Some(SessionEvent::Proposed { auto_start_in_secs, .. }) => {
                assert_eq!(auto_start_in_secs, delay)
            }
            other => panic!("expected proposal, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await,
            Some(SessionEvent::Started { .. })
        ));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_command_is_rejected() {
        let (handle, _events) = spawn_engine(MomentsEngine::new(), Some(4));

        let result = handle.send(Command::Resume).await;
        assert!(matches!(result, Err(MomentError::InvalidTransition { .. })));

        let result = handle
            .send(Command::SetContext(HostContext {
                user_id: Some("u-1".to_string()),
                health_data: None,
            }))
            .await;
        assert!(matches!(result, Ok(None)));

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().context.user_id.as_deref(), Some("u-1"));

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.phase(), SessionPhase::Idle);
    }
}
