// src/trigger.rs

//! The reload action fired for every accepted change event.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ReloadwatchError, RuntimeError};
use crate::watch::ChangeEvent;

/// Something the event loop fires once per accepted event.
pub trait ReloadTrigger: Send + fmt::Debug {
    fn fire(&mut self, event: &ChangeEvent) -> Result<(), RuntimeError>;
}

/// The file whose truncation tells an external supervisor to reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelFile {
    path: PathBuf,
}

impl SentinelFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ReloadwatchError> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(ReloadwatchError::ConfigError(format!(
                "sentinel path {path:?} has no file name"
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the sentinel to zero length, creating it if missing.
    ///
    /// Nothing is written; the file is closed as soon as it is opened.
    pub fn touch(&self) -> Result<(), RuntimeError> {
        File::create(&self.path).map_err(|source| RuntimeError::SentinelWriteFailed {
            path: self.path.clone(),
            source,
        })?;
        debug!("touched sentinel {:?}", self.path);
        Ok(())
    }
}

impl ReloadTrigger for SentinelFile {
    fn fire(&mut self, _event: &ChangeEvent) -> Result<(), RuntimeError> {
        self.touch()
    }
}
