#![allow(dead_code)]

use std::path::Path;

use tempfile::TempDir;

use reloadwatch::config::DEFAULT_MAX_WATCHES;
use reloadwatch::notify::mock::{MockChannel, MockFeeder, MockWatchState};
use reloadwatch::watch::{ScanOptions, WatchSession};
use reloadwatch_test_utils::builders::TreeBuilder;

/// The canonical project layout:
///
/// ```text
/// proj/
///   app/
///   static/
///   main.py
///   reload.wsgi
/// ```
pub fn proj_tree() -> TempDir {
    TreeBuilder::new()
        .dir("app")
        .dir("static")
        .file("main.py", "print('hi')\n")
        .file("reload.wsgi", "")
        .build()
}

/// Start a session over `root` on a fresh mock channel.
pub fn start_mock(
    root: &Path,
    options: &ScanOptions,
) -> (WatchSession<MockChannel>, MockFeeder, MockWatchState) {
    let (channel, feeder) = MockChannel::new();
    let state = channel.state();
    let (session, _report) = WatchSession::start(channel, root, options, DEFAULT_MAX_WATCHES)
        .expect("failed to start mock session");
    (session, feeder, state)
}
