// src/config/model.rs

use std::ffi::OsString;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{ScanErrorPolicy, SentinelMatch};
use crate::watch::scanner::{ScanOptions, DEFAULT_SKIP_NAME, PATH_MAX};

/// Default ceiling on concurrent watches (the kernel's upper bound for
/// `max_user_watches`).
pub const DEFAULT_MAX_WATCHES: usize = 524_288;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// root = "/proj"
/// skip = ["static"]
/// max_watches = 524288
/// on_scan_error = "abort"
/// follow_symlinks = false
///
/// [sentinel]
/// path = "/proj/reload.wsgi"
/// match = "basename"
/// ```
///
/// Every field is optional here; command-line flags may fill in the gaps
/// before [`ConfigFile::try_from`] checks the result.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: RawWatchSection,

    #[serde(default)]
    pub sentinel: RawSentinelSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWatchSection {
    /// Directory tree to watch.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Directory names excluded from watching, at any depth.
    #[serde(default = "default_skip")]
    pub skip: Vec<String>,

    /// Upper bound on the number of watches held at once.
    #[serde(default = "default_max_watches")]
    pub max_watches: usize,

    /// `"abort"` (default) or `"skip"`.
    #[serde(default)]
    pub on_scan_error: ScanErrorPolicy,

    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_skip() -> Vec<String> {
    vec![DEFAULT_SKIP_NAME.to_string()]
}

fn default_max_watches() -> usize {
    DEFAULT_MAX_WATCHES
}

impl Default for RawWatchSection {
    fn default() -> Self {
        Self {
            root: None,
            skip: default_skip(),
            max_watches: default_max_watches(),
            on_scan_error: ScanErrorPolicy::default(),
            follow_symlinks: false,
        }
    }
}

/// `[sentinel]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSentinelSection {
    /// File truncated on every accepted change.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// `"basename"` (default) or `"path"`.
    #[serde(default, rename = "match")]
    pub match_mode: SentinelMatch,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchConfig,
    pub sentinel: SentinelConfig,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub root: PathBuf,
    pub skip: Vec<String>,
    pub max_watches: usize,
    pub on_scan_error: ScanErrorPolicy,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub path: PathBuf,
    pub match_mode: SentinelMatch,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchConfig, sentinel: SentinelConfig) -> Self {
        Self { watch, sentinel }
    }

    /// Scanner options derived from the `[watch]` section.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            skip_names: self.watch.skip.iter().map(OsString::from).collect(),
            on_error: self.watch.on_scan_error,
            follow_symlinks: self.watch.follow_symlinks,
            max_path_len: PATH_MAX,
        }
    }
}
