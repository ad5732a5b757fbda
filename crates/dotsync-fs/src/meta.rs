//! Metadata snapshots used for change detection

use std::fs::Metadata;
use std::time::SystemTime;

/// Permission bits (including setuid/setgid/sticky) of a mode value.
pub const PERMISSION_MASK: u32 = 0o7777;

/// Snapshot of one real (symlink-resolved) filesystem entry.
///
/// Two snapshots compare equal only when modification time, size and mode
/// all match, which is what the watch loop uses to skip unchanged sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub modified: SystemTime,
    pub size: u64,
    pub mode: u32,
}

impl FileMeta {
    /// Build a snapshot from already-fetched metadata.
    ///
    /// Platforms without a modification time fall back to the Unix epoch,
    /// which makes every comparison against a real timestamp a mismatch.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: meta.len(),
            mode: mode_of(meta),
        }
    }

    /// Permission bits of the snapshot's mode.
    pub fn permissions(&self) -> u32 {
        self.mode & PERMISSION_MASK
    }
}

/// Raw mode bits of a metadata record.
#[cfg(unix)]
pub fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

/// Raw mode bits of a metadata record.
#[cfg(not(unix))]
pub fn mode_of(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
