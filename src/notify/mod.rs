// src/notify/mod.rs

//! Kernel change-notification channel.
//!
//! [`NotifyChannel`] is the seam between the watch logic and the operating
//! system: the registry adds and removes watches through it and the event
//! loop reads raw batches from it. [`inotify::InotifyChannel`] is the Linux
//! implementation; [`mock::MockChannel`] is an in-process stand-in for tests.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;

use bitflags::bitflags;

#[cfg(target_os = "linux")]
pub mod inotify;
pub mod mock;

/// Opaque token the kernel hands back for a registered directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(pub i32);

impl WatchHandle {
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wd {}", self.0)
    }
}

bitflags! {
    /// Event bits as laid out by the kernel's inotify ABI.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const ACCESS = 0x0000_0001;
        const MODIFY = 0x0000_0002;
        const ATTRIB = 0x0000_0004;
        const CLOSE_WRITE = 0x0000_0008;
        const CLOSE_NOWRITE = 0x0000_0010;
        const OPEN = 0x0000_0020;
        const MOVED_FROM = 0x0000_0040;
        const MOVED_TO = 0x0000_0080;
        const CREATE = 0x0000_0100;
        const DELETE = 0x0000_0200;
        const DELETE_SELF = 0x0000_0400;
        const MOVE_SELF = 0x0000_0800;
        const UNMOUNT = 0x0000_2000;
        const Q_OVERFLOW = 0x0000_4000;
        const IGNORED = 0x0000_8000;
        const ONLYDIR = 0x0100_0000;
        const DONT_FOLLOW = 0x0200_0000;
        const EXCL_UNLINK = 0x0400_0000;
        const MASK_ADD = 0x2000_0000;
        const ISDIR = 0x4000_0000;
        const ONESHOT = 0x8000_0000;
    }
}

/// Events every directory watch subscribes to: content and attribute changes.
pub const WATCH_MASK: EventMask = EventMask::MODIFY.union(EventMask::ATTRIB);

/// Future returned by [`NotifyChannel::read_batch`].
pub type ReadFuture<'a> = Pin<Box<dyn Future<Output = io::Result<usize>> + Send + 'a>>;

/// A source of change notifications.
///
/// Implementations must make `read_batch` cancel-safe: dropping the future
/// before it resolves must not lose any pending events.
pub trait NotifyChannel: Send + fmt::Debug {
    /// Register interest in `path` and return the kernel's handle for it.
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle>;

    /// Release a handle previously returned by [`add_watch`](Self::add_watch).
    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()>;

    /// Wait for the next batch of raw event records and copy it into `buf`.
    ///
    /// `Ok(0)` means the channel reached end of stream.
    fn read_batch<'a>(&'a mut self, buf: &'a mut [u8]) -> ReadFuture<'a>;

    /// Close the channel, surfacing any error from the final close.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}
