// src/engine/filter.rs

use std::ffi::OsString;
use std::path::PathBuf;

use crate::types::SentinelMatch;
use crate::watch::{ChangeEvent, WatchRegistry};

/// Recognises events caused by the sentinel file itself.
///
/// Touching the sentinel is itself a modification inside a watched
/// directory; without this check every reload would trigger another one.
#[derive(Debug, Clone)]
pub struct SentinelFilter {
    file_name: OsString,
    path: PathBuf,
    mode: SentinelMatch,
}

impl SentinelFilter {
    /// `path` should be in the same form as the watched directories
    /// (canonical, if the root was canonicalised) for `FullPath` matching.
    pub fn new(path: impl Into<PathBuf>, mode: SentinelMatch) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        Self {
            file_name,
            path,
            mode,
        }
    }

    pub fn mode(&self) -> SentinelMatch {
        self.mode
    }

    /// Whether `event` concerns the sentinel. Events without a name never do.
    pub fn is_sentinel(&self, event: &ChangeEvent, registry: &WatchRegistry) -> bool {
        let Some(name) = &event.name else {
            return false;
        };

        match self.mode {
            SentinelMatch::BaseName => *name == self.file_name,
            SentinelMatch::FullPath => registry
                .path_of(event.handle)
                .is_some_and(|dir| dir.join(name) == self.path),
        }
    }
}
