// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, SentinelConfig, WatchConfig};
use crate::errors::{ReloadwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ReloadwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let RawConfigFile { watch, sentinel } = raw;
        let root = watch.root.ok_or_else(missing_root)?;
        let path = sentinel.path.ok_or_else(missing_sentinel)?;

        Ok(ConfigFile::new_unchecked(
            WatchConfig {
                root,
                skip: watch.skip,
                max_watches: watch.max_watches,
                on_scan_error: watch.on_scan_error,
                follow_symlinks: watch.follow_symlinks,
            },
            SentinelConfig {
                path,
                match_mode: sentinel.match_mode,
            },
        ))
    }
}

/// Run semantic validation against a raw configuration.
///
/// This checks:
/// - a watch root and a sentinel path are present
/// - the sentinel path names a file
/// - `max_watches >= 1`
/// - skip names are single, non-empty path components
///
/// It does **not** touch the filesystem; whether the root exists is a
/// startup concern.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_sentinel_section(cfg)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.root.is_none() {
        return Err(missing_root());
    }

    if cfg.watch.max_watches == 0 {
        return Err(ReloadwatchError::ConfigError(
            "[watch].max_watches must be >= 1 (got 0)".to_string(),
        ));
    }

    for name in cfg.watch.skip.iter() {
        if name.is_empty() {
            return Err(ReloadwatchError::ConfigError(
                "[watch].skip contains an empty name".to_string(),
            ));
        }
        if name.contains('/') {
            return Err(ReloadwatchError::ConfigError(format!(
                "[watch].skip entry '{}' must be a directory name, not a path",
                name
            )));
        }
    }

    Ok(())
}

fn validate_sentinel_section(cfg: &RawConfigFile) -> Result<()> {
    let Some(path) = &cfg.sentinel.path else {
        return Err(missing_sentinel());
    };

    if path.file_name().is_none() {
        return Err(ReloadwatchError::ConfigError(format!(
            "sentinel path {:?} does not name a file",
            path
        )));
    }

    Ok(())
}

fn missing_root() -> ReloadwatchError {
    ReloadwatchError::ConfigError(
        "no watch root given (set [watch].root or pass --watch-dir)".to_string(),
    )
}

fn missing_sentinel() -> ReloadwatchError {
    ReloadwatchError::ConfigError(
        "no sentinel file given (set [sentinel].path or pass --sentinel)".to_string(),
    )
}
