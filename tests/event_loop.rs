// tests/event_loop.rs

mod common;
use crate::common::{proj_tree, start_mock};
use reloadwatch_test_utils::builders::{canonical_root, init_tracing, with_timeout, BatchBuilder};
use reloadwatch_test_utils::fake_trigger::{FailingTrigger, RecordingTrigger};

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use reloadwatch::engine::{CoreLoop, LoopStats, Runtime, SentinelFilter};
use reloadwatch::errors::{ProtocolError, RuntimeError};
use reloadwatch::notify::mock::{MockFeeder, MockWatchState};
use reloadwatch::notify::EventMask;
use reloadwatch::trigger::ReloadTrigger;
use reloadwatch::types::SentinelMatch;
use reloadwatch::watch::ScanOptions;
use reloadwatch::watch_until_shutdown;

/// Handle of the root directory: the first watch placed on a mock channel.
const ROOT: i32 = 1;

struct Harness {
    feeder: MockFeeder,
    state: MockWatchState,
    shutdown: CancellationToken,
    task: JoinHandle<Result<LoopStats, RuntimeError>>,
}

fn spawn_loop<T>(root: &Path, mode: SentinelMatch, trigger: T) -> Harness
where
    T: ReloadTrigger + 'static,
{
    let (session, feeder, state) = start_mock(root, &ScanOptions::default());
    let filter = SentinelFilter::new(root.join("reload.wsgi"), mode);
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(watch_until_shutdown(
        session,
        filter,
        trigger,
        shutdown.clone(),
    ));
    Harness {
        feeder,
        state,
        shutdown,
        task,
    }
}

/// Feed `batches`, then end the stream so the loop drains and stops.
async fn run_to_end(harness: Harness, batches: Vec<Vec<u8>>) -> (Result<LoopStats, RuntimeError>, MockWatchState) {
    let Harness {
        feeder,
        state,
        shutdown: _shutdown,
        task,
    } = harness;
    for batch in batches {
        assert!(feeder.push(batch));
    }
    drop(feeder);
    let result = with_timeout(task).await.expect("event loop panicked");
    (result, state)
}

fn names(trigger: &RecordingTrigger) -> Vec<Option<String>> {
    trigger
        .fired()
        .into_iter()
        .map(|e| e.name.map(|n| n.to_string_lossy().into_owned()))
        .collect()
}

#[tokio::test]
async fn modified_source_file_triggers_reload() {
    init_tracing();
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let batch = BatchBuilder::new()
        .event(ROOT, EventMask::MODIFY, Some("main.py"))
        .build();
    let (result, state) = run_to_end(harness, vec![batch]).await;

    assert!(matches!(result, Err(RuntimeError::ChannelClosed)));
    assert_eq!(names(&trigger), vec![Some("main.py".to_string())]);
    let fired = trigger.fired();
    assert_eq!(fired[0].mask, EventMask::MODIFY);
    assert_eq!(fired[0].cookie, None);

    // Teardown ran on the way out.
    assert_eq!(state.active_count(), 0);
    assert!(state.is_closed());
}

#[tokio::test]
async fn sentinel_modification_is_ignored() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let batches = vec![
        BatchBuilder::new()
            .event(ROOT, EventMask::MODIFY, Some("reload.wsgi"))
            .event(ROOT, EventMask::ATTRIB, Some("reload.wsgi"))
            .build(),
        BatchBuilder::new()
            .event(ROOT, EventMask::MODIFY, Some("main.py"))
            .build(),
    ];
    let (_result, _state) = run_to_end(harness, batches).await;

    assert_eq!(names(&trigger), vec![Some("main.py".to_string())]);
}

#[tokio::test]
async fn one_reload_per_event_in_a_batch() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let app = harness.state.handle_for(&root.join("app")).unwrap().raw();
    let batch = BatchBuilder::new()
        .event(app, EventMask::MODIFY, Some("views.py"))
        .event(ROOT, EventMask::ATTRIB, None)
        .event(ROOT, EventMask::MODIFY, Some("reload.wsgi"))
        .event(app, EventMask::MODIFY | EventMask::ISDIR, Some("models"))
        .build();
    let (result, _state) = run_to_end(harness, vec![batch]).await;

    assert!(matches!(result, Err(RuntimeError::ChannelClosed)));
    assert_eq!(
        names(&trigger),
        vec![
            Some("views.py".to_string()),
            None,
            Some("models".to_string()),
        ]
    );
}

#[tokio::test]
async fn rename_cookie_is_carried_through() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let batch = BatchBuilder::new()
        .event_with_cookie(ROOT, EventMask::MODIFY, 42, Some("main.py"))
        .build();
    let _ = run_to_end(harness, vec![batch]).await;

    assert_eq!(trigger.fired()[0].cookie, Some(42));
}

#[tokio::test]
async fn basename_match_ignores_sentinel_name_in_any_directory() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let app = harness.state.handle_for(&root.join("app")).unwrap().raw();
    let batch = BatchBuilder::new()
        .event(app, EventMask::MODIFY, Some("reload.wsgi"))
        .build();
    let _ = run_to_end(harness, vec![batch]).await;

    assert_eq!(trigger.count(), 0);
}

#[tokio::test]
async fn full_path_match_only_ignores_the_real_sentinel() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::FullPath, trigger.clone());
    let app = harness.state.handle_for(&root.join("app")).unwrap().raw();
    let batch = BatchBuilder::new()
        .event(ROOT, EventMask::MODIFY, Some("reload.wsgi"))
        .event(app, EventMask::MODIFY, Some("reload.wsgi"))
        .build();
    let _ = run_to_end(harness, vec![batch]).await;

    let fired = trigger.fired();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].handle.raw(), app);
    assert_eq!(fired[0].name.as_deref(), Some(OsStr::new("reload.wsgi")));
}

#[tokio::test]
async fn released_watch_is_forgotten() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let app = harness.state.handle_for(&root.join("app")).unwrap();
    // The kernel drops the watch itself when the directory goes away.
    harness.state.invalidate(app);
    let batch = BatchBuilder::new()
        .event(app.raw(), EventMask::IGNORED, None)
        .build();
    let (result, state) = run_to_end(harness, vec![batch]).await;

    assert!(matches!(result, Err(RuntimeError::ChannelClosed)));
    assert_eq!(trigger.count(), 1);
    // Teardown did not try to release it a second time.
    assert!(!state.removed().contains(&app));
    assert_eq!(state.removed().len(), 1);
    assert_eq!(state.active_count(), 0);
}

#[tokio::test]
async fn released_root_leaves_no_root_behind() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let (session, feeder, state) = start_mock(&root, &ScanOptions::default());
    let root_wd = state.handle_for(&root).unwrap();
    state.invalidate(root_wd);
    assert!(feeder.push(
        BatchBuilder::new()
            .event(root_wd.raw(), EventMask::IGNORED, None)
            .build(),
    ));
    drop(feeder);

    let filter = SentinelFilter::new(root.join("reload.wsgi"), SentinelMatch::BaseName);
    let mut runtime = Runtime::new(
        session,
        CoreLoop::new(filter),
        trigger.clone(),
        CancellationToken::new(),
    );
    let result = with_timeout(runtime.run()).await;

    assert!(matches!(result, Err(RuntimeError::ChannelClosed)));
    assert_eq!(trigger.count(), 1);
    assert_eq!(runtime.core().stats().reloads, 1);
    let registry = runtime.session().registry();
    assert!(registry.root().is_none());
    assert_eq!(registry.len(), 1);
    assert!(registry.contains_path(&root.join("app")));

    runtime.into_session().teardown().unwrap();
    assert_eq!(state.active_count(), 0);
}

#[tokio::test]
async fn read_error_is_fatal() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    assert!(harness.feeder.fail(io::ErrorKind::Other));
    let (result, state) = run_to_end(harness, vec![]).await;

    assert!(matches!(
        result,
        Err(RuntimeError::ReadFailed(ref e)) if e.kind() == io::ErrorKind::Other
    ));
    assert_eq!(trigger.count(), 0);
    assert!(state.is_closed());
}

#[tokio::test]
async fn malformed_batch_fires_nothing() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let harness = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());
    let batch = BatchBuilder::new()
        .event(ROOT, EventMask::MODIFY, Some("main.py"))
        .raw(&[0u8; 5])
        .build();
    let (result, state) = run_to_end(harness, vec![batch]).await;

    assert!(matches!(
        result,
        Err(RuntimeError::Protocol(ProtocolError::TruncatedHeader {
            remaining: 5,
            ..
        }))
    ));
    assert_eq!(trigger.count(), 0);
    assert_eq!(state.active_count(), 0);
}

#[tokio::test]
async fn failing_trigger_stops_the_loop() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let sentinel: PathBuf = root.join("reload.wsgi");

    let harness = spawn_loop(&root, SentinelMatch::BaseName, FailingTrigger::new(&sentinel));
    let batch = BatchBuilder::new()
        .event(ROOT, EventMask::MODIFY, Some("main.py"))
        .build();
    let (result, state) = run_to_end(harness, vec![batch]).await;

    assert!(matches!(
        result,
        Err(RuntimeError::SentinelWriteFailed { ref path, .. }) if *path == sentinel
    ));
    assert!(state.is_closed());
}

#[tokio::test]
async fn shutdown_while_idle_stops_cleanly() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let Harness {
        feeder,
        state,
        shutdown,
        task,
    } = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();
    let stats = with_timeout(task).await.unwrap().unwrap();

    assert_eq!(stats, LoopStats::default());
    assert_eq!(state.active_count(), 0);
    assert!(state.is_closed());
    drop(feeder);
}

#[tokio::test]
async fn shutdown_after_work_reports_stats() {
    let dir = proj_tree();
    let root = canonical_root(&dir);
    let trigger = RecordingTrigger::new();

    let Harness {
        feeder,
        state,
        shutdown,
        task,
    } = spawn_loop(&root, SentinelMatch::BaseName, trigger.clone());

    feeder.push(
        BatchBuilder::new()
            .event(ROOT, EventMask::MODIFY, Some("main.py"))
            .event(ROOT, EventMask::MODIFY, Some("reload.wsgi"))
            .build(),
    );
    with_timeout(async {
        while trigger.count() < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    shutdown.cancel();
    let stats = with_timeout(task).await.unwrap().unwrap();

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.events, 2);
    assert_eq!(stats.reloads, 1);
    assert_eq!(stats.skipped, 1);
    assert!(state.is_closed());
}
