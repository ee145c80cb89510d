// src/errors.rs

//! Crate-wide error types.
//!
//! The taxonomy follows the lifecycle of a watch session:
//! - [`SetupError`]: the channel or the initial watch set could not be built.
//! - [`ScanError`]: one directory of the tree could not be walked.
//! - [`RuntimeError`]: the event loop cannot continue.
//! - [`TeardownError`]: some handles failed to release at shutdown.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::notify::WatchHandle;

/// Failures of a single Watch Registry operation.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("watch limit of {capacity} reached, cannot watch {path:?}")]
    WatchLimitExceeded { capacity: usize, path: PathBuf },

    #[error("failed to watch {path:?}: {source}")]
    RegistrationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path:?} resolved to {handle}, which already watches {existing:?}")]
    AlreadyWatched {
        path: PathBuf,
        handle: WatchHandle,
        existing: PathBuf,
    },

    #[error("{0} is not registered")]
    UnknownHandle(WatchHandle),

    #[error("failed to remove {handle} ({path:?}): {source}")]
    DeregistrationFailed {
        handle: WatchHandle,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures while walking a directory tree.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("could not open directory {path:?}: {source}")]
    DirectoryOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path {path:?} is {len} bytes, limit is {limit}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        limit: usize,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ScanError {
    /// Errors that stop the scan regardless of the configured policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Registry(RegistryError::WatchLimitExceeded { .. })
        )
    }
}

/// A batch read from the notification channel did not parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated event header at offset {offset}: {remaining} bytes left, need {needed}")]
    TruncatedHeader {
        offset: usize,
        remaining: usize,
        needed: usize,
    },

    #[error("event name at offset {offset} claims {len} bytes, only {remaining} left")]
    NameOverrun {
        offset: usize,
        len: usize,
        remaining: usize,
    },
}

/// The process cannot enter the event loop.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to initialise notification channel: {0}")]
    ChannelInit(#[source] io::Error),

    #[error("watch root {path:?} is not usable: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("sentinel {path:?} is not usable: {source}")]
    SentinelUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to watch root directory: {0}")]
    RootRegistration(#[source] RegistryError),

    #[error("initial scan failed: {0}")]
    Scan(#[source] ScanError),
}

/// The event loop stopped on a fatal condition.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("error reading notification channel: {0}")]
    ReadFailed(#[source] io::Error),

    #[error("notification channel returned end of stream")]
    ChannelClosed,

    #[error("malformed event batch: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("failed to touch sentinel {path:?}: {source}")]
    SentinelWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handles that could not be released at shutdown.
///
/// Teardown always runs to completion; this only reports what went wrong.
#[derive(Debug, Default)]
pub struct TeardownError {
    pub failures: Vec<RegistryError>,
    pub close: Option<io::Error>,
}

impl TeardownError {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.close.is_none()
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to release {} watch(es)", self.failures.len())?;
        if let Some(err) = &self.close {
            write!(f, "; closing channel failed: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {}

#[derive(Error, Debug)]
pub enum ReloadwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ReloadwatchError>;
