// src/config/mod.rs

//! Configuration loading and validation for reloadwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate the merged file + command-line values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, RawConfigFile, RawSentinelSection, RawWatchSection, SentinelConfig, WatchConfig,
    DEFAULT_MAX_WATCHES,
};
pub use validate::validate_raw_config;
