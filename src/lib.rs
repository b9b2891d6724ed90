//! Synheart Moments - On-device engine for guided micro-moments
//!
//! Moments drives a wellness screen: simulated live metrics, threshold triggers
//! that propose a short exercise, and a countdown session timer:
//! metric simulation → trigger evaluation → session timer → view snapshot.
//!
//! ## Modules
//!
//! - **Engine**: Stateful processor owning metrics, triggers, session and history
//! - **Runtime**: Async driver with the metric and session-second timers
//! - **FFI**: C bindings for host UIs

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod trigger;
pub mod types;
pub mod view;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use catalog::MomentCatalog;
pub use config::EngineConfig;
pub use engine::MomentsEngine;
pub use error::MomentError;
pub use runtime::{spawn_engine, Command, EngineHandle};
pub use types::{CompletedRecord, LiveMetrics, Moment, SessionEvent, SessionPhase};
pub use view::ViewSnapshot;

/// Moments version embedded in all view snapshots
pub const MOMENTS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for view snapshots
pub const PRODUCER_NAME: &str = "synheart-moments";
