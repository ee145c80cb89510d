#![allow(dead_code)]

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use tempfile::TempDir;
use tracing_subscriber::{fmt, EnvFilter};

use reloadwatch::config::{ConfigFile, RawConfigFile};
use reloadwatch::notify::EventMask;
use reloadwatch::types::{ScanErrorPolicy, SentinelMatch};

/// Filter used when `RUST_LOG` is unset: everything this crate logs.
const DEFAULT_TEST_FILTER: &str = "reloadwatch=debug";

/// Upper bound on any single awaited step in a test.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured by the harness and shown only for failing tests.
/// `RUST_LOG=reloadwatch::engine=trace` narrows or widens it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));
        // Another subscriber may already be installed by the test itself.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("no progress within {TEST_TIMEOUT:?}"),
    }
}

/// Builder for raw inotify batches, encoded exactly as the kernel lays
/// them out (native endian, names NUL-padded to a 16-byte boundary).
#[derive(Debug, Default)]
pub struct BatchBuilder {
    bytes: Vec<u8>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event without a rename cookie.
    pub fn event(self, handle: i32, mask: EventMask, name: Option<&str>) -> Self {
        self.event_with_cookie(handle, mask, 0, name)
    }

    pub fn event_with_cookie(
        mut self,
        handle: i32,
        mask: EventMask,
        cookie: u32,
        name: Option<&str>,
    ) -> Self {
        let name = name.map(str::as_bytes).unwrap_or_default();
        let padded = if name.is_empty() {
            0
        } else {
            (name.len() + 1).div_ceil(16) * 16
        };

        self.bytes.extend_from_slice(&handle.to_ne_bytes());
        self.bytes.extend_from_slice(&mask.bits().to_ne_bytes());
        self.bytes.extend_from_slice(&cookie.to_ne_bytes());
        self.bytes.extend_from_slice(&(padded as u32).to_ne_bytes());
        self.bytes.extend_from_slice(name);
        self.bytes
            .extend(std::iter::repeat_n(0u8, padded - name.len()));
        self
    }

    /// Append arbitrary bytes, e.g. to produce a malformed batch.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Builder for a directory tree inside a fresh temporary directory.
pub struct TreeBuilder {
    dir: TempDir,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Create `rel` (and its parents) as a directory.
    pub fn dir(self, rel: &str) -> Self {
        fs::create_dir_all(self.dir.path().join(rel)).expect("failed to create directory");
        self
    }

    /// Create `rel` as a file with `contents`, creating parent directories.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directory");
        }
        fs::write(&path, contents).expect("failed to write file");
        self
    }

    /// Create a symlink at `rel` pointing at `target` (relative to the root
    /// of the tree).
    pub fn symlink(self, rel: &str, target: &str) -> Self {
        let link = self.dir.path().join(rel);
        let target = self.dir.path().join(target);
        std::os::unix::fs::symlink(target, link).expect("failed to create symlink");
        self
    }

    pub fn build(self) -> TempDir {
        self.dir
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical root of a built tree, matching what the scanner registers.
pub fn canonical_root(dir: &TempDir) -> PathBuf {
    dir.path().canonicalize().expect("failed to canonicalize temp dir")
}

/// Builder for `RawConfigFile` / `ConfigFile`.
pub struct RawConfigBuilder {
    config: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new(root: impl AsRef<Path>, sentinel: impl AsRef<Path>) -> Self {
        let mut config = RawConfigFile::default();
        config.watch.root = Some(root.as_ref().to_path_buf());
        config.sentinel.path = Some(sentinel.as_ref().to_path_buf());
        Self { config }
    }

    pub fn skip(mut self, names: &[&str]) -> Self {
        self.config.watch.skip = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn max_watches(mut self, max: usize) -> Self {
        self.config.watch.max_watches = max;
        self
    }

    pub fn on_scan_error(mut self, policy: ScanErrorPolicy) -> Self {
        self.config.watch.on_scan_error = policy;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.watch.follow_symlinks = follow;
        self
    }

    pub fn sentinel_match(mut self, mode: SentinelMatch) -> Self {
        self.config.sentinel.match_mode = mode;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
