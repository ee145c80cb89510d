// src/watch/registry.rs

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{RegistryError, TeardownError};
use crate::notify::{EventMask, NotifyChannel, WATCH_MASK};

pub use crate::notify::WatchHandle;

/// One registered directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub handle: WatchHandle,
    pub path: PathBuf,
}

/// Ordered set of active watch handles.
///
/// The first directory added to an empty registry is the root; the rest
/// follow discovery order. The root stays pinned by handle, so removing or
/// forgetting other entries never promotes a subdirectory in its place.
/// Every handle appears at most once, and the number of entries never
/// exceeds the capacity given at construction.
#[derive(Debug)]
pub struct WatchRegistry {
    entries: Vec<WatchEntry>,
    root: Option<WatchHandle>,
    capacity: usize,
}

impl WatchRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            root: None,
            capacity,
        }
    }

    /// Watch `path` for content and attribute changes.
    ///
    /// Paths that are not directories are rejected by the channel.
    pub fn add<C: NotifyChannel>(
        &mut self,
        channel: &mut C,
        path: &Path,
    ) -> Result<WatchHandle, RegistryError> {
        if self.entries.len() >= self.capacity {
            return Err(RegistryError::WatchLimitExceeded {
                capacity: self.capacity,
                path: path.to_path_buf(),
            });
        }

        let handle = channel
            .add_watch(path, WATCH_MASK | EventMask::ONLYDIR)
            .map_err(|source| RegistryError::RegistrationFailed {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(existing) = self.path_of(handle) {
            return Err(RegistryError::AlreadyWatched {
                path: path.to_path_buf(),
                handle,
                existing: existing.to_path_buf(),
            });
        }

        debug!("watching {:?} using {}", path, handle);
        if self.entries.is_empty() {
            self.root = Some(handle);
        }
        self.entries.push(WatchEntry {
            handle,
            path: path.to_path_buf(),
        });
        Ok(handle)
    }

    /// Release `handle`.
    ///
    /// The entry leaves the registry even when the channel reports a
    /// failure, since the kernel no longer honours it either way.
    pub fn remove<C: NotifyChannel>(
        &mut self,
        channel: &mut C,
        handle: WatchHandle,
    ) -> Result<(), RegistryError> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.handle == handle)
            .ok_or(RegistryError::UnknownHandle(handle))?;
        let entry = self.entries.remove(idx);
        self.release_root(handle);

        channel
            .remove_watch(handle)
            .map_err(|source| RegistryError::DeregistrationFailed {
                handle,
                path: entry.path.clone(),
                source,
            })?;

        debug!("removed {} ({:?})", handle, entry.path);
        Ok(())
    }

    /// Drop a handle the kernel has already released, without a syscall.
    pub fn forget(&mut self, handle: WatchHandle) -> Option<WatchEntry> {
        let idx = self.entries.iter().position(|e| e.handle == handle)?;
        self.release_root(handle);
        Some(self.entries.remove(idx))
    }

    fn release_root(&mut self, handle: WatchHandle) {
        if self.root == Some(handle) {
            self.root = None;
        }
    }

    /// Release every handle. The registry is empty afterwards, whatever
    /// the outcome; failures are collected rather than stopping the sweep.
    pub fn teardown<C: NotifyChannel>(&mut self, channel: &mut C) -> Result<(), TeardownError> {
        let mut report = TeardownError::default();
        self.root = None;

        for entry in std::mem::take(&mut self.entries) {
            match channel.remove_watch(entry.handle) {
                Ok(()) => debug!("removed {} ({:?})", entry.handle, entry.path),
                Err(source) => {
                    warn!("failed to remove {} ({:?}): {}", entry.handle, entry.path, source);
                    report.failures.push(RegistryError::DeregistrationFailed {
                        handle: entry.handle,
                        path: entry.path,
                        source,
                    });
                }
            }
        }

        if report.is_empty() { Ok(()) } else { Err(report) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The root directory's entry; `None` once it has been removed or
    /// released by the kernel.
    pub fn root(&self) -> Option<&WatchEntry> {
        let root = self.root?;
        self.entries.iter().find(|e| e.handle == root)
    }

    pub fn path_of(&self, handle: WatchHandle) -> Option<&Path> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.path.as_path())
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.iter()
    }
}
