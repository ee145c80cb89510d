// src/engine/core.rs

//! Pure core of the event loop.
//!
//! [`CoreLoop`] consumes [`LoopEvent`]s and produces [`CoreCommand`]s. It has
//! no channels, no Tokio types and performs no IO, so the batch protocol and
//! the filtering rule can be tested with plain byte slices.

use tracing::trace;

use crate::engine::filter::SentinelFilter;
use crate::engine::{CoreCommand, CoreStep, LoopEvent, LoopState, LoopStats};
use crate::errors::ProtocolError;
use crate::notify::EventMask;
use crate::watch::{decode_batch, WatchRegistry};

#[derive(Debug)]
pub struct CoreLoop {
    filter: SentinelFilter,
    state: LoopState,
    stats: LoopStats,
}

impl CoreLoop {
    pub fn new(filter: SentinelFilter) -> Self {
        Self {
            filter,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Handle one input.
    ///
    /// A batch moves the loop to `Draining`; it stays there until the shell
    /// has executed the returned commands and calls
    /// [`finish_batch`](Self::finish_batch). A malformed batch produces no
    /// commands at all.
    pub fn step(
        &mut self,
        event: LoopEvent<'_>,
        registry: &WatchRegistry,
    ) -> Result<CoreStep, ProtocolError> {
        match event {
            LoopEvent::Batch(batch) => self.drain(batch, registry),
            LoopEvent::ShutdownRequested => {
                self.state = LoopState::Terminal;
                Ok(CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                })
            }
        }
    }

    /// The shell has executed every command of the current batch.
    pub fn finish_batch(&mut self) {
        if self.state == LoopState::Draining {
            self.state = LoopState::Idle;
        }
    }

    fn drain(&mut self, batch: &[u8], registry: &WatchRegistry) -> Result<CoreStep, ProtocolError> {
        self.state = LoopState::Draining;
        trace!(bytes = batch.len(), "draining batch");

        let events = decode_batch(batch)?;
        self.stats.batches += 1;
        self.stats.bytes += batch.len() as u64;
        self.stats.events += events.len() as u64;

        let mut commands = Vec::with_capacity(events.len());
        for event in events {
            if self.filter.is_sentinel(&event, registry) {
                trace!("skip sentinel event: {}", event);
                self.stats.skipped += 1;
                continue;
            }

            if event.mask.contains(EventMask::IGNORED) {
                commands.push(CoreCommand::Forget(event.handle));
            }
            self.stats.reloads += 1;
            commands.push(CoreCommand::Reload(event));
        }

        Ok(CoreStep {
            commands,
            keep_running: true,
        })
    }
}
