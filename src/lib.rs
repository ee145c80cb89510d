// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod notify;
pub mod trigger;
pub mod types;
pub mod watch;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile, RawConfigFile};
use crate::engine::{CoreLoop, LoopStats, Runtime, SentinelFilter};
use crate::errors::{RuntimeError, SetupError};
use crate::notify::NotifyChannel;
use crate::trigger::{ReloadTrigger, SentinelFile};
use crate::watch::WatchSession;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + command-line overrides
/// - the notification channel and the initial watch set
/// - the event loop and the sentinel trigger
/// - Ctrl-C handling
/// - teardown of every watch on the way out
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root = cfg
        .watch
        .root
        .canonicalize()
        .map_err(|source| SetupError::RootUnavailable {
            path: cfg.watch.root.clone(),
            source,
        })?;
    let sentinel_path =
        resolve_sentinel_path(&cfg.sentinel.path).map_err(|source| SetupError::SentinelUnavailable {
            path: cfg.sentinel.path.clone(),
            source,
        })?;
    let sentinel = SentinelFile::new(&sentinel_path)?;
    let filter = SentinelFilter::new(&sentinel_path, cfg.sentinel.match_mode);
    info!(
        root = ?root,
        sentinel = ?sentinel.path(),
        "matching sentinel events by {}",
        filter.mode()
    );

    // Ctrl-C → graceful shutdown.
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received, shutting down");
            shutdown.cancel();
        });
    }

    let channel = open_channel()?;
    let (session, report) =
        WatchSession::start(channel, &root, &cfg.scan_options(), cfg.watch.max_watches)?;
    for branch in &report.skipped {
        debug!(path = ?branch.path, "unwatched branch: {}", branch.error);
    }

    let stats = watch_until_shutdown(session, filter, sentinel, shutdown).await?;
    debug!(?stats, "reloadwatch finished");
    Ok(())
}

/// Run the event loop on an already started session, then tear it down.
///
/// Teardown happens whether or not the loop failed; teardown problems are
/// logged and do not change the result.
pub async fn watch_until_shutdown<C, T>(
    session: WatchSession<C>,
    filter: SentinelFilter,
    trigger: T,
    shutdown: CancellationToken,
) -> std::result::Result<LoopStats, RuntimeError>
where
    C: NotifyChannel,
    T: ReloadTrigger,
{
    let mut runtime = Runtime::new(session, CoreLoop::new(filter), trigger, shutdown);
    let outcome = runtime.run().await;

    if let Err(err) = &outcome {
        let stats = runtime.core().stats();
        error!(
            batches = stats.batches,
            reloads = stats.reloads,
            "event loop failed: {err}"
        );
    }

    debug!(
        watches = runtime.session().registry().len(),
        "tearing down watches"
    );
    if let Err(report) = runtime.into_session().teardown() {
        error!("error cleaning up watchers: {report}");
        for failure in &report.failures {
            error!("  {failure}");
        }
    }

    outcome
}

/// Merge the optional config file with command-line overrides and validate.
pub fn resolve_config(args: &CliArgs) -> errors::Result<ConfigFile> {
    let mut raw = load_or_default(args.config.as_deref())?;
    apply_cli_overrides(&mut raw, args);
    ConfigFile::try_from(raw)
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(dir) = &args.watch_dir {
        raw.watch.root = Some(dir.clone());
    }
    if let Some(path) = &args.sentinel {
        raw.sentinel.path = Some(path.clone());
    }
    if !args.skip.is_empty() {
        raw.watch.skip = args.skip.clone();
    }
    if let Some(max) = args.max_watches {
        raw.watch.max_watches = max;
    }
    if let Some(policy) = args.on_scan_error {
        raw.watch.on_scan_error = policy.into();
    }
    if args.follow_symlinks {
        raw.watch.follow_symlinks = true;
    }
    if let Some(mode) = args.sentinel_match {
        raw.sentinel.match_mode = mode.into();
    }
}

/// Canonicalise the sentinel's directory so it compares equal to watched
/// paths. The sentinel itself may not exist yet.
fn resolve_sentinel_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "sentinel path has no file name")
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(parent.canonicalize()?.join(file_name))
}

#[cfg(target_os = "linux")]
fn open_channel() -> std::result::Result<notify::inotify::InotifyChannel, SetupError> {
    notify::inotify::InotifyChannel::new().map_err(SetupError::ChannelInit)
}

#[cfg(not(target_os = "linux"))]
fn open_channel() -> std::result::Result<notify::mock::MockChannel, SetupError> {
    Err(SetupError::ChannelInit(io::Error::new(
        io::ErrorKind::Unsupported,
        "reloadwatch needs inotify, which is only available on Linux",
    )))
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("reloadwatch dry-run");
    println!("  watch.root = {:?}", cfg.watch.root);
    println!("  watch.skip = {:?}", cfg.watch.skip);
    println!("  watch.max_watches = {}", cfg.watch.max_watches);
    println!("  watch.on_scan_error = {}", cfg.watch.on_scan_error);
    println!("  watch.follow_symlinks = {}", cfg.watch.follow_symlinks);
    println!("  sentinel.path = {:?}", cfg.sentinel.path);
    println!("  sentinel.match = {}", cfg.sentinel.match_mode);

    debug!("dry-run complete (nothing watched)");
}
