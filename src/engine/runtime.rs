// src/engine/runtime.rs

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::errors::RuntimeError;
use crate::notify::NotifyChannel;
use crate::trigger::ReloadTrigger;
use crate::watch::{WatchSession, BATCH_BUFFER_LEN};

use super::core::CoreLoop;
use super::{CoreCommand, LoopEvent, LoopStats};

/// Drives the core loop from a live [`WatchSession`] and delegates the
/// reload side effect to a [`ReloadTrigger`].
///
/// This is the IO shell around [`CoreLoop`]: it waits on the channel,
/// hands each batch to the core and executes the resulting commands.
pub struct Runtime<C: NotifyChannel, T: ReloadTrigger> {
    session: WatchSession<C>,
    core: CoreLoop,
    trigger: T,
    shutdown: CancellationToken,
}

impl<C: NotifyChannel, T: ReloadTrigger> fmt::Debug for Runtime<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl<C: NotifyChannel, T: ReloadTrigger> Runtime<C, T> {
    pub fn new(
        session: WatchSession<C>,
        core: CoreLoop,
        trigger: T,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session,
            core,
            trigger,
            shutdown,
        }
    }

    pub fn core(&self) -> &CoreLoop {
        &self.core
    }

    pub fn session(&self) -> &WatchSession<C> {
        &self.session
    }

    /// Give the session back so the caller can tear it down.
    pub fn into_session(self) -> WatchSession<C> {
        self.session
    }

    /// Main event loop.
    ///
    /// - Checks the shutdown token before every read.
    /// - Waits for either a batch or shutdown; a batch that has been read is
    ///   always drained completely before shutdown is looked at again.
    /// - End of stream, read errors, malformed batches and trigger failures
    ///   end the loop with an error.
    pub async fn run(&mut self) -> Result<LoopStats, RuntimeError> {
        info!(
            watches = self.session.registry().len(),
            "reloadwatch event loop started"
        );
        let mut buf = vec![0u8; BATCH_BUFFER_LEN];

        loop {
            if self.shutdown.is_cancelled() {
                let step = self
                    .core
                    .step(LoopEvent::ShutdownRequested, self.session.registry())?;
                debug_assert!(!step.keep_running);
                info!("shutdown requested; stopping event loop");
                break;
            }

            let read = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => continue,
                read = self.session.channel_mut().read_batch(&mut buf) => read,
            };

            let len = match read {
                Ok(0) => return Err(RuntimeError::ChannelClosed),
                Ok(len) => len,
                Err(err) => return Err(RuntimeError::ReadFailed(err)),
            };
            trace!("read {} bytes from notification channel", len);

            let step = self
                .core
                .step(LoopEvent::Batch(&buf[..len]), self.session.registry())?;
            for command in step.commands {
                self.execute_command(command)?;
            }
            self.core.finish_batch();

            if !step.keep_running {
                break;
            }
        }

        let stats = self.core.stats();
        info!(
            batches = stats.batches,
            reloads = stats.reloads,
            skipped = stats.skipped,
            "event loop exiting"
        );
        Ok(stats)
    }

    fn execute_command(&mut self, command: CoreCommand) -> Result<(), RuntimeError> {
        match command {
            CoreCommand::Reload(event) => {
                debug!("{}", event);
                self.trigger.fire(&event)?;
                info!("reload triggered");
            }
            CoreCommand::Forget(handle) => {
                if let Some(entry) = self.session.registry_mut().forget(handle) {
                    debug!("{} released by kernel ({:?})", handle, entry.path);
                }
            }
        }
        Ok(())
    }
}
