use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use reloadwatch::errors::RuntimeError;
use reloadwatch::trigger::ReloadTrigger;
use reloadwatch::watch::ChangeEvent;

/// A trigger that records every event it was fired for.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
    fired: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far, in firing order.
    pub fn fired(&self) -> Vec<ChangeEvent> {
        self.fired.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.fired.lock().unwrap().len()
    }
}

impl ReloadTrigger for RecordingTrigger {
    fn fire(&mut self, event: &ChangeEvent) -> Result<(), RuntimeError> {
        self.fired.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// A trigger whose every firing fails like an unwritable sentinel.
#[derive(Debug, Clone)]
pub struct FailingTrigger {
    path: PathBuf,
}

impl FailingTrigger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReloadTrigger for FailingTrigger {
    fn fire(&mut self, _event: &ChangeEvent) -> Result<(), RuntimeError> {
        Err(RuntimeError::SentinelWriteFailed {
            path: self.path.clone(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        })
    }
}
