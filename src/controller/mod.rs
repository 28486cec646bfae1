//! View-state controllers that sequence database calls for the UI.
//!
//! Each controller owns one sequencer task. Actions are queued and handled
//! strictly one at a time; every database call is awaited before the next
//! dependent step runs, and observable state is published only after an
//! action's whole sequence has finished. Dropping a controller aborts its
//! task: writes already handed to the database still commit, later steps of
//! the interrupted action do not run.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::{runtime::handle::RuntimeError, types::TimestampMs};

/// Rating screen controller.
pub mod quality;
/// Start/stop/clear controller.
pub mod tracker;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("controller has been closed")]
    Closed,
}

/// Source of "now" for session timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> TimestampMs;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> TimestampMs {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as TimestampMs)
            .unwrap_or(0)
    }
}
