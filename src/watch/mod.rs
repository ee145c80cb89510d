// src/watch/mod.rs

//! Watch-set construction and maintenance.
//!
//! This module is responsible for:
//! - Tracking which directories are watched and under which handle
//!   ([`registry`]).
//! - Walking the tree to watch every directory below the root ([`scanner`]).
//! - Turning raw notification batches into [`ChangeEvent`]s ([`decoder`]).
//! - Owning the channel and registry for the lifetime of a run ([`session`]).
//!
//! It does **not** decide what an event means; that is the engine's job.

pub mod decoder;
pub mod registry;
pub mod scanner;
pub mod session;

pub use decoder::{decode_batch, ChangeEvent, BATCH_BUFFER_LEN};
pub use registry::{WatchEntry, WatchRegistry};
pub use scanner::{scan, ScanOptions, ScanReport, SkippedBranch};
pub use session::WatchSession;
