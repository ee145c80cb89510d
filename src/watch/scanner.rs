// src/watch/scanner.rs

//! Depth-first directory walk that puts a watch on every subdirectory.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::errors::ScanError;
use crate::notify::NotifyChannel;
use crate::types::ScanErrorPolicy;
use crate::watch::registry::WatchRegistry;

/// Directory name skipped when nothing else is configured.
pub const DEFAULT_SKIP_NAME: &str = "static";

/// Longest path the scanner will construct, terminator included.
pub const PATH_MAX: usize = libc::PATH_MAX as usize;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory names that are neither watched nor descended into.
    pub skip_names: Vec<OsString>,
    pub on_error: ScanErrorPolicy,
    /// Descend into symbolic links that point at directories.
    pub follow_symlinks: bool,
    pub max_path_len: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            skip_names: vec![OsString::from(DEFAULT_SKIP_NAME)],
            on_error: ScanErrorPolicy::default(),
            follow_symlinks: false,
            max_path_len: PATH_MAX,
        }
    }
}

/// A subtree left unwatched under [`ScanErrorPolicy::Skip`].
#[derive(Debug)]
pub struct SkippedBranch {
    pub path: PathBuf,
    pub error: ScanError,
    /// `path` itself is watched; only what lies below it is not.
    pub watched: bool,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Watches added by this scan (the starting directory not included).
    pub registered: usize,
    pub skipped: Vec<SkippedBranch>,
}

/// Identity of a directory on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DirId {
    dev: u64,
    ino: u64,
}

impl DirId {
    fn of(meta: &fs::Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

/// Register a watch on every directory below `dir`, recursively.
///
/// `dir` itself must already be registered by the caller. Entries are
/// visited in whatever order the filesystem enumerates them.
pub fn scan<C: NotifyChannel>(
    channel: &mut C,
    dir: &Path,
    registry: &mut WatchRegistry,
    options: &ScanOptions,
) -> Result<ScanReport, ScanError> {
    let root_meta = fs::metadata(dir).map_err(|source| ScanError::DirectoryOpenFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut scanner = Scanner {
        channel,
        registry,
        options,
        visited: HashSet::from([DirId::of(&root_meta)]),
        report: ScanReport::default(),
    };
    scanner.walk(dir)?;

    debug!(
        registered = scanner.report.registered,
        skipped = scanner.report.skipped.len(),
        "scan of {:?} complete",
        dir
    );
    Ok(scanner.report)
}

struct Scanner<'a, C> {
    channel: &'a mut C,
    registry: &'a mut WatchRegistry,
    options: &'a ScanOptions,
    visited: HashSet<DirId>,
    report: ScanReport,
}

impl<C: NotifyChannel> Scanner<'_, C> {
    fn walk(&mut self, dir: &Path) -> Result<(), ScanError> {
        let open_failed = |source: io::Error| ScanError::DirectoryOpenFailed {
            path: dir.to_path_buf(),
            source,
        };

        // `read_dir` never yields the `.` and `..` entries.
        for entry in fs::read_dir(dir).map_err(open_failed)? {
            let entry = entry.map_err(open_failed)?;
            let name = entry.file_name();

            match self.is_directory(&entry.path(), entry.file_type()) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    self.recover(entry.path(), err)?;
                    continue;
                }
            }
            if self.options.skip_names.iter().any(|skip| *skip == name) {
                debug!("skipping {:?}", dir.join(&name));
                continue;
            }

            let child = dir.join(&name);
            if let Err(err) = self.visit(&child) {
                self.recover(child, err)?;
            }
        }

        Ok(())
    }

    /// Check length and identity, register, then descend.
    fn visit(&mut self, child: &Path) -> Result<(), ScanError> {
        let len = child.as_os_str().len();
        if len >= self.options.max_path_len {
            return Err(ScanError::PathTooLong {
                path: child.to_path_buf(),
                len,
                limit: self.options.max_path_len,
            });
        }

        let meta = fs::metadata(child).map_err(|source| ScanError::DirectoryOpenFailed {
            path: child.to_path_buf(),
            source,
        })?;
        if !self.visited.insert(DirId::of(&meta)) {
            debug!("{:?} is already watched through another path", child);
            return Ok(());
        }

        self.registry.add(&mut *self.channel, child)?;
        self.report.registered += 1;

        self.walk(child)
    }

    /// Whether `path` should be descended into. A dangling symlink is not a
    /// directory; any other failure to classify the entry is an error.
    fn is_directory(
        &self,
        path: &Path,
        file_type: io::Result<fs::FileType>,
    ) -> Result<bool, ScanError> {
        let open_failed = |source: io::Error| ScanError::DirectoryOpenFailed {
            path: path.to_path_buf(),
            source,
        };

        let file_type = file_type.map_err(open_failed)?;
        if !file_type.is_symlink() {
            return Ok(file_type.is_dir());
        }
        if !self.options.follow_symlinks {
            trace!("not following symlink {:?}", path);
            return Ok(false);
        }
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("dangling symlink {:?}", path);
                Ok(false)
            }
            Err(err) => Err(open_failed(err)),
        }
    }

    fn recover(&mut self, path: PathBuf, error: ScanError) -> Result<(), ScanError> {
        if self.options.on_error == ScanErrorPolicy::Abort || error.is_fatal() {
            return Err(error);
        }
        // A directory can be registered and still fail to list.
        let watched = self.registry.contains_path(&path);
        if watched {
            warn!("watching {:?} but not its contents: {}", path, error);
        } else {
            warn!("leaving {:?} unwatched: {}", path, error);
        }
        self.report.skipped.push(SkippedBranch {
            path,
            error,
            watched,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::notify::mock::MockChannel;

    fn skipping() -> ScanOptions {
        ScanOptions {
            on_error: ScanErrorPolicy::Skip,
            ..ScanOptions::default()
        }
    }

    #[test]
    fn unreadable_entry_type_is_an_error() {
        let (mut channel, _feeder) = MockChannel::new();
        let mut registry = WatchRegistry::new(4);
        let options = skipping();
        let scanner = Scanner {
            channel: &mut channel,
            registry: &mut registry,
            options: &options,
            visited: HashSet::new(),
            report: ScanReport::default(),
        };

        let err = scanner
            .is_directory(
                Path::new("/proj/app"),
                Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ScanError::DirectoryOpenFailed { ref path, .. } if path == Path::new("/proj/app")
        ));
    }

    #[test]
    fn dangling_symlink_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let link = dir.path().join("gone");
        std::os::unix::fs::symlink(dir.path().join("missing"), &link).unwrap();

        let (mut channel, _feeder) = MockChannel::new();
        let mut registry = WatchRegistry::new(4);
        let options = ScanOptions {
            follow_symlinks: true,
            ..ScanOptions::default()
        };
        let scanner = Scanner {
            channel: &mut channel,
            registry: &mut registry,
            options: &options,
            visited: HashSet::new(),
            report: ScanReport::default(),
        };

        let file_type = fs::symlink_metadata(&link).map(|m| m.file_type());
        assert!(!scanner.is_directory(&link, file_type).unwrap());
    }

    #[test]
    fn listing_failure_below_a_watched_directory_keeps_its_watch() {
        let dir = tempdir().unwrap();
        let app = dir.path().join("app");
        let lib = dir.path().join("lib");
        std::fs::create_dir(&app).unwrap();

        let (mut channel, _feeder) = MockChannel::new();
        let mut registry = WatchRegistry::new(4);
        registry.add(&mut channel, dir.path()).unwrap();
        registry.add(&mut channel, &app).unwrap();
        let options = skipping();
        let mut scanner = Scanner {
            channel: &mut channel,
            registry: &mut registry,
            options: &options,
            visited: HashSet::new(),
            report: ScanReport::default(),
        };

        let denied = |path: &Path| ScanError::DirectoryOpenFailed {
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        scanner.recover(app.clone(), denied(&app)).unwrap();
        scanner.recover(lib.clone(), denied(&lib)).unwrap();

        let skipped = &scanner.report.skipped;
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].path, app);
        assert!(skipped[0].watched);
        assert_eq!(skipped[1].path, lib);
        assert!(!skipped[1].watched);
    }

    #[test]
    fn abort_policy_propagates_listing_failure() {
        let (mut channel, _feeder) = MockChannel::new();
        let mut registry = WatchRegistry::new(4);
        let options = ScanOptions::default();
        let mut scanner = Scanner {
            channel: &mut channel,
            registry: &mut registry,
            options: &options,
            visited: HashSet::new(),
            report: ScanReport::default(),
        };

        let result = scanner.recover(
            PathBuf::from("/proj/app"),
            ScanError::DirectoryOpenFailed {
                path: PathBuf::from("/proj/app"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );

        assert!(matches!(result, Err(ScanError::DirectoryOpenFailed { .. })));
        assert!(scanner.report.skipped.is_empty());
    }
}
