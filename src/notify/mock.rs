// src/notify/mock.rs

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::{EventMask, NotifyChannel, ReadFuture, WatchHandle};

/// What the next `read_batch` call should produce.
#[derive(Debug, Clone)]
pub enum MockRead {
    Batch(Vec<u8>),
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockInner {
    next_handle: i32,
    active: BTreeMap<WatchHandle, PathBuf>,
    refused: HashSet<PathBuf>,
    removed: Vec<WatchHandle>,
    added: usize,
    closed: bool,
}

/// Shared view of a [`MockChannel`]'s watch table.
///
/// Cloning is cheap; clones observe the same channel, so tests can keep one
/// after the channel itself has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct MockWatchState {
    inner: Arc<Mutex<MockInner>>,
}

impl MockWatchState {
    fn lock(&self) -> MutexGuard<'_, MockInner> {
        // A panic in another test thread must not hide this one's state.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of currently active watches.
    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// Paths of the currently active watches.
    pub fn active_paths(&self) -> Vec<PathBuf> {
        self.lock().active.values().cloned().collect()
    }

    pub fn handle_for(&self, path: &Path) -> Option<WatchHandle> {
        self.lock()
            .active
            .iter()
            .find(|(_, p)| p.as_path() == path)
            .map(|(handle, _)| *handle)
    }

    /// Total number of successful `add_watch` calls that created a watch.
    pub fn added_count(&self) -> usize {
        self.lock().added
    }

    /// Handles released through `remove_watch`, in order.
    pub fn removed(&self) -> Vec<WatchHandle> {
        self.lock().removed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Make `add_watch` fail with `PermissionDenied` for `path`.
    pub fn refuse(&self, path: impl Into<PathBuf>) {
        self.lock().refused.insert(path.into());
    }

    /// Simulate the kernel dropping a watch on its own, e.g. because the
    /// directory was deleted. Later removal of `handle` fails.
    pub fn invalidate(&self, handle: WatchHandle) {
        self.lock().active.remove(&handle);
    }
}

/// In-process [`NotifyChannel`] driven by a [`MockFeeder`].
#[derive(Debug)]
pub struct MockChannel {
    state: MockWatchState,
    reads: mpsc::UnboundedReceiver<MockRead>,
}

/// Sending half of a [`MockChannel`]. Dropping every feeder ends the stream.
#[derive(Debug, Clone)]
pub struct MockFeeder {
    tx: mpsc::UnboundedSender<MockRead>,
}

impl MockFeeder {
    /// Queue one raw batch. Returns `false` if the channel is gone.
    pub fn push(&self, batch: impl Into<Vec<u8>>) -> bool {
        self.tx.send(MockRead::Batch(batch.into())).is_ok()
    }

    /// Make the next read fail with `kind`.
    pub fn fail(&self, kind: io::ErrorKind) -> bool {
        self.tx.send(MockRead::Error(kind)).is_ok()
    }
}

impl MockChannel {
    pub fn new() -> (Self, MockFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            state: MockWatchState::default(),
            reads: rx,
        };
        (channel, MockFeeder { tx })
    }

    pub fn state(&self) -> MockWatchState {
        self.state.clone()
    }
}

impl NotifyChannel for MockChannel {
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle> {
        let mut inner = self.state.lock();

        if inner.refused.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("watch refused for {path:?}"),
            ));
        }
        if mask.contains(EventMask::ONLYDIR) && !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{path:?} is not a directory"),
            ));
        }

        // The kernel hands back the existing descriptor for a watched inode.
        if let Some((handle, _)) = inner.active.iter().find(|(_, p)| p.as_path() == path) {
            return Ok(*handle);
        }

        inner.next_handle += 1;
        let handle = WatchHandle(inner.next_handle);
        inner.active.insert(handle, path.to_path_buf());
        inner.added += 1;
        Ok(handle)
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        let mut inner = self.state.lock();
        if inner.active.remove(&handle).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{handle} is not an active watch"),
            ));
        }
        inner.removed.push(handle);
        Ok(())
    }

    fn read_batch<'a>(&'a mut self, buf: &'a mut [u8]) -> ReadFuture<'a> {
        Box::pin(async move {
            match self.reads.recv().await {
                Some(MockRead::Batch(batch)) => {
                    if batch.len() > buf.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("batch of {} bytes exceeds buffer of {}", batch.len(), buf.len()),
                        ));
                    }
                    buf[..batch.len()].copy_from_slice(&batch);
                    Ok(batch.len())
                }
                Some(MockRead::Error(kind)) => Err(io::Error::from(kind)),
                None => Ok(0),
            }
        })
    }

    fn close(self) -> io::Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
