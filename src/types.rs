use std::fmt;

use serde::Deserialize;

/// What the tree scanner does when a subdirectory cannot be watched.
///
/// - `Abort`: the first failure stops the scan and startup fails (default).
/// - `Skip`: the failing branch is logged and left unwatched; siblings are
///   still scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanErrorPolicy {
    #[default]
    Abort,
    Skip,
}

impl fmt::Display for ScanErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanErrorPolicy::Abort => f.write_str("abort"),
            ScanErrorPolicy::Skip => f.write_str("skip"),
        }
    }
}

/// How an event's file name is compared against the sentinel file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SentinelMatch {
    /// Any entry with the sentinel's base name, in any watched directory.
    #[default]
    BaseName,
    /// Only the sentinel itself (watched directory + name equals its path).
    #[serde(rename = "path", alias = "fullpath")]
    FullPath,
}

impl fmt::Display for SentinelMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelMatch::BaseName => f.write_str("basename"),
            SentinelMatch::FullPath => f.write_str("path"),
        }
    }
}
