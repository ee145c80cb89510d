// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::{ScanErrorPolicy, SentinelMatch};

/// Command-line arguments for `reloadwatch`.
///
/// Every option except `--config`, `--log-level` and `--dry-run` overrides
/// the matching value from the config file.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reloadwatch",
    version,
    about = "Touch a sentinel file whenever anything under a directory tree changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to an optional config file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root of the directory tree to watch.
    #[arg(short = 'w', long = "watch-dir", value_name = "DIR")]
    pub watch_dir: Option<PathBuf>,

    /// Sentinel file truncated on every change.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub sentinel: Option<PathBuf>,

    /// Directory name to leave unwatched (repeatable; replaces the default
    /// `static`).
    #[arg(long = "skip", value_name = "NAME")]
    pub skip: Vec<String>,

    /// Maximum number of directories watched at once.
    #[arg(long, value_name = "N")]
    pub max_watches: Option<usize>,

    /// What to do when a subdirectory cannot be watched.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_scan_error: Option<ScanErrorArg>,

    /// Descend into symlinked directories.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// How events are matched against the sentinel file.
    #[arg(long, value_enum, value_name = "MODE")]
    pub sentinel_match: Option<SentinelMatchArg>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RELOADWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the configuration, but don't watch anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ScanErrorArg {
    Abort,
    Skip,
}

impl From<ScanErrorArg> for ScanErrorPolicy {
    fn from(arg: ScanErrorArg) -> Self {
        match arg {
            ScanErrorArg::Abort => ScanErrorPolicy::Abort,
            ScanErrorArg::Skip => ScanErrorPolicy::Skip,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum SentinelMatchArg {
    Basename,
    Path,
}

impl From<SentinelMatchArg> for SentinelMatch {
    fn from(arg: SentinelMatchArg) -> Self {
        match arg {
            SentinelMatchArg::Basename => SentinelMatch::BaseName,
            SentinelMatchArg::Path => SentinelMatch::FullPath,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
