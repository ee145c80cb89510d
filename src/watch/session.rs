// src/watch/session.rs

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::errors::{SetupError, TeardownError};
use crate::notify::NotifyChannel;
use crate::watch::registry::WatchRegistry;
use crate::watch::scanner::{scan, ScanOptions, ScanReport};

/// Everything a running watcher owns: the notification channel and the
/// registry of watches placed on it.
///
/// Built by [`WatchSession::start`] and released by
/// [`WatchSession::teardown`]. Nothing is process-global, so several
/// sessions can coexist (e.g. in tests).
#[derive(Debug)]
pub struct WatchSession<C: NotifyChannel> {
    channel: C,
    registry: WatchRegistry,
    root: PathBuf,
}

impl<C: NotifyChannel> WatchSession<C> {
    /// Watch `root`, then every directory below it.
    ///
    /// If the scan fails, whatever was registered is released and the
    /// channel is closed before the error is returned.
    pub fn start(
        mut channel: C,
        root: &Path,
        options: &ScanOptions,
        max_watches: usize,
    ) -> Result<(Self, ScanReport), SetupError> {
        let mut registry = WatchRegistry::new(max_watches);

        if let Err(err) = registry.add(&mut channel, root) {
            if let Err(close_err) = channel.close() {
                error!("failed to close notification channel: {}", close_err);
            }
            return Err(SetupError::RootRegistration(err));
        }

        let report = match scan(&mut channel, root, &mut registry, options) {
            Ok(report) => report,
            Err(err) => {
                let session = Self {
                    channel,
                    registry,
                    root: root.to_path_buf(),
                };
                if let Err(teardown_err) = session.teardown() {
                    error!("cleanup after failed scan: {}", teardown_err);
                }
                return Err(SetupError::Scan(err));
            }
        };

        info!(
            watches = registry.len(),
            skipped = report.skipped.len(),
            "watching {:?}",
            root
        );

        Ok((
            Self {
                channel,
                registry,
                root: root.to_path_buf(),
            },
            report,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WatchRegistry {
        &mut self.registry
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Release every watch and close the channel.
    ///
    /// Always runs to completion; the error lists what could not be released.
    pub fn teardown(mut self) -> Result<(), TeardownError> {
        let released = self.registry.len();
        let mut report = match self.registry.teardown(&mut self.channel) {
            Ok(()) => TeardownError::default(),
            Err(report) => report,
        };

        if let Err(err) = self.channel.close() {
            report.close = Some(err);
        }

        if report.is_empty() {
            info!(released, "watch session closed");
            Ok(())
        } else {
            Err(report)
        }
    }
}
