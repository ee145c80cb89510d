// src/notify/inotify.rs

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tokio::io::unix::AsyncFd;
use tracing::debug;

use super::{EventMask, NotifyChannel, ReadFuture, WatchHandle};

/// Linux inotify instance registered with the tokio reactor.
///
/// The descriptor is non-blocking, so a pending read is just a readiness
/// wait that can be dropped at any time without consuming events.
#[derive(Debug)]
pub struct InotifyChannel {
    fd: AsyncFd<OwnedFd>,
}

impl InotifyChannel {
    /// Create a new inotify instance.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> io::Result<Self> {
        // SAFETY: takes no pointers; the result is checked before use.
        let raw = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` is a freshly created descriptor that nothing else owns.
        let owned = unsafe { OwnedFd::from_raw_fd(raw) };
        debug!(fd = raw, "inotify channel opened");
        Ok(Self {
            fd: AsyncFd::new(owned)?,
        })
    }
}

impl NotifyChannel for InotifyChannel {
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> io::Result<WatchHandle> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path contains a NUL byte: {path:?}"),
            )
        })?;

        // SAFETY: `c_path` is NUL-terminated and outlives the call; the fd is
        // owned by `self.fd` and still open.
        let wd = unsafe {
            libc::inotify_add_watch(self.fd.as_raw_fd(), c_path.as_ptr(), mask.bits())
        };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(WatchHandle(wd))
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> io::Result<()> {
        // SAFETY: plain integer arguments on an fd owned by `self.fd`.
        let status = unsafe { libc::inotify_rm_watch(self.fd.as_raw_fd(), handle.raw()) };
        if status < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn read_batch<'a>(&'a mut self, buf: &'a mut [u8]) -> ReadFuture<'a> {
        Box::pin(async move {
            loop {
                let mut guard = self.fd.readable().await?;
                let result = guard.try_io(|inner| {
                    // SAFETY: `buf` is a live, exclusively borrowed slice and
                    // the length passed is exactly its length.
                    let n = unsafe {
                        libc::read(inner.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len())
                    };
                    if n < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(n as usize)
                    }
                });

                match result {
                    Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Ok(read) => return read,
                    // Spurious readiness; wait again.
                    Err(_would_block) => continue,
                }
            }
        })
    }

    fn close(self) -> io::Result<()> {
        let raw = self.fd.into_inner().into_raw_fd();
        // SAFETY: ownership was released by `into_raw_fd`; this is the only close.
        if unsafe { libc::close(raw) } < 0 {
            return Err(io::Error::last_os_error());
        }
        debug!(fd = raw, "inotify channel closed");
        Ok(())
    }
}
