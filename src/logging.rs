// src/logging.rs

//! Logging setup for `reloadwatch` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `RELOADWATCH_LOG` environment variable, read as an `EnvFilter`
//!    directive list (e.g. "debug" or "info,reloadwatch::watch=trace")
//! 3. default to `info`

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "RELOADWATCH_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env_value.as_deref())?;

    // Stderr only; the sentinel is the program's one real output.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    if let Some(lvl) = cli_level {
        return EnvFilter::builder()
            .parse(directive_for(lvl))
            .context("invalid --log-level directive");
    }

    let directives = env_value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVE);
    EnvFilter::builder()
        .parse(directives)
        .with_context(|| format!("invalid {LOG_ENV_VAR} value {directives:?}"))
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_accepts_per_module_directives() {
        let filter = build_filter(None, Some(" info,reloadwatch::watch=debug ")).unwrap();
        assert!(filter.to_string().contains("reloadwatch::watch=debug"));
    }

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Trace), Some("reloadwatch=loud")).unwrap();
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn blank_env_falls_back_to_info() {
        let filter = build_filter(None, Some("   ")).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn invalid_env_value_is_reported() {
        let err = build_filter(None, Some("reloadwatch=loud")).unwrap_err();
        assert!(err.to_string().contains(LOG_ENV_VAR));
    }
}
