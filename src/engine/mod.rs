// src/engine/mod.rs

//! Event loop for reloadwatch.
//!
//! The loop reads raw batches from the notification channel, decodes them,
//! drops events caused by the sentinel file and fires the reload trigger for
//! everything else.
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::notify::WatchHandle;
use crate::watch::ChangeEvent;

/// Where the loop is in its read/drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Waiting for the next batch.
    #[default]
    Idle,
    /// Working through a batch that has already been read.
    Draining,
    /// Shutdown observed; no further batches will be read.
    Terminal,
}

/// Inputs to the core state machine.
#[derive(Debug, Clone, Copy)]
pub enum LoopEvent<'a> {
    /// One read's worth of raw event records.
    Batch(&'a [u8]),
    /// Shutdown was requested; observed between batches.
    ShutdownRequested,
}

/// Work the IO shell must carry out for a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Fire the reload trigger for this event.
    Reload(ChangeEvent),
    /// The kernel released this watch (its directory is gone).
    Forget(WatchHandle),
}

/// Result of feeding one [`LoopEvent`] to the core.
#[derive(Debug, Default)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

/// Counters kept across the life of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub batches: u64,
    pub bytes: u64,
    pub events: u64,
    pub reloads: u64,
    pub skipped: u64,
}

pub mod core;
pub mod filter;
pub mod runtime;

pub use core::CoreLoop;
pub use filter::SentinelFilter;
pub use runtime::Runtime;
