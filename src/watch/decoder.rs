// src/watch/decoder.rs

//! Decoding of raw inotify batches.
//!
//! A batch is a concatenation of variable-length records:
//!
//! ```text
//! i32 wd | u32 mask | u32 cookie | u32 len | len bytes of NUL-padded name
//! ```
//!
//! all in native byte order.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;

use crate::errors::ProtocolError;
use crate::notify::{EventMask, WatchHandle};

/// Size of the fixed record header.
pub const EVENT_HEADER_LEN: usize = 16;

/// Longest file name a record can carry.
pub const NAME_MAX: usize = 255;

/// Read buffer size: room for ten records with maximal names.
pub const BATCH_BUFFER_LEN: usize = 10 * (EVENT_HEADER_LEN + NAME_MAX + 1);

/// One decoded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub handle: WatchHandle,
    pub mask: EventMask,
    /// Groups the two halves of a rename; `None` when the kernel sent 0.
    pub cookie: Option<u32>,
    /// Entry inside the watched directory; `None` when the event concerns
    /// the directory itself.
    pub name: Option<OsString>,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handle)?;
        if let Some(cookie) = self.cookie {
            write!(f, "; cookie = {cookie}")?;
        }
        f.write_str("; mask =")?;
        let mut any = false;
        for (flag, _) in self.mask.iter_names() {
            write!(f, " {flag}")?;
            any = true;
        }
        if !any {
            write!(f, " {:#x}", self.mask.bits())?;
        }
        if let Some(name) = &self.name {
            write!(f, "; name = {}", name.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Decode every record in `batch`.
///
/// The whole batch is validated before anything is returned, so a malformed
/// batch never yields a partial set of events.
pub fn decode_batch(batch: &[u8]) -> Result<Vec<ChangeEvent>, ProtocolError> {
    let mut events = Vec::new();
    let mut offset = 0;

    while offset < batch.len() {
        let remaining = batch.len() - offset;
        if remaining < EVENT_HEADER_LEN {
            return Err(ProtocolError::TruncatedHeader {
                offset,
                remaining,
                needed: EVENT_HEADER_LEN,
            });
        }

        let header = &batch[offset..offset + EVENT_HEADER_LEN];
        let wd = i32::from_ne_bytes(word(header, 0));
        let mask = u32::from_ne_bytes(word(header, 4));
        let cookie = u32::from_ne_bytes(word(header, 8));
        let len = u32::from_ne_bytes(word(header, 12)) as usize;

        let name_start = offset + EVENT_HEADER_LEN;
        let name_room = batch.len() - name_start;
        if len > name_room {
            return Err(ProtocolError::NameOverrun {
                offset,
                len,
                remaining: name_room,
            });
        }

        events.push(ChangeEvent {
            handle: WatchHandle(wd),
            mask: EventMask::from_bits_retain(mask),
            cookie: (cookie != 0).then_some(cookie),
            name: decode_name(&batch[name_start..name_start + len]),
        });

        offset = name_start + len;
    }

    Ok(events)
}

fn word(header: &[u8], at: usize) -> [u8; 4] {
    [header[at], header[at + 1], header[at + 2], header[at + 3]]
}

fn decode_name(field: &[u8]) -> Option<OsString> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    if end == 0 {
        return None;
    }
    Some(OsStr::from_bytes(&field[..end]).to_os_string())
}
