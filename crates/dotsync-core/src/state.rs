//! State store for the set of tracked relative paths
//!
//! The state file lists, one per line, every source artifact (file or
//! section) applied to the destination by an earlier pass. It is the only
//! record used to decide what to prune.
//!
//! The file is held under an exclusive advisory lock for a whole pass, so
//! two instances working on the same source never interleave their state.
//! Its own modification time and size key an in-process cache of the last
//! load; a save always drops that cache.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dotsync_fs::Capabilities;
use dotsync_fs::io::open_for_update;
use tracing::debug;

use crate::{Error, Result};

/// Relative keys of every tracked artifact, sorted.
pub type TrackedSet = BTreeSet<String>;

/// Parse state file content: one key per line, surrounding whitespace and
/// blank lines ignored.
pub fn parse_state(content: &[u8]) -> TrackedSet {
    String::from_utf8_lossy(content)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render a tracked set: sorted, one key per line, each newline-terminated.
pub fn render_state(entries: &TrackedSet) -> Vec<u8> {
    let mut out = Vec::new();
    for key in entries {
        out.extend_from_slice(key.as_bytes());
        out.push(b'\n');
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: SystemTime,
    size: u64,
}

impl Stamp {
    fn of(file: &File, path: &Path) -> Result<Self> {
        let meta = file.metadata().map_err(|e| Error::state_access(path, e))?;
        Ok(Self {
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: meta.len(),
        })
    }
}

/// Exclusive hold on the state file for the duration of a pass.
///
/// Dropping the guard closes the handle, which releases the lock.
#[derive(Debug)]
pub struct StateGuard {
    file: File,
    path: PathBuf,
}

impl StateGuard {
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Loads and saves the tracked set, caching the last parsed content.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    create_mode: u32,
    cached: Option<(Stamp, TrackedSet)>,
}

impl StateStore {
    /// A store for the state file at `path`, created with `0666 & !umask`.
    pub fn new(path: impl Into<PathBuf>, umask: u32) -> Self {
        Self {
            path: path.into(),
            create_mode: 0o666 & !umask,
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (creating if needed) and exclusively lock the state file.
    ///
    /// Blocks until any other holder releases the lock.
    pub fn lock(&self, caps: &Capabilities) -> Result<StateGuard> {
        let file = open_for_update(&self.path, self.create_mode).map_err(|e| match e {
            dotsync_fs::Error::Io { path, source } => Error::StateAccess { path, source },
            other => Error::Fs(other),
        })?;
        caps.locker
            .lock(&file, true)
            .map_err(|source| Error::StateLock {
                path: self.path.clone(),
                source,
            })?;
        Ok(StateGuard {
            file,
            path: self.path.clone(),
        })
    }

    /// Read the tracked set through the locked handle.
    ///
    /// The cached set is returned when the file's modification time and size
    /// are unchanged since the last load.
    pub fn load(&mut self, guard: &mut StateGuard) -> Result<TrackedSet> {
        let stamp = Stamp::of(&guard.file, &self.path)?;
        if let Some((cached_stamp, entries)) = &self.cached
            && *cached_stamp == stamp
        {
            debug!(path = %self.path.display(), "Using cached state");
            return Ok(entries.clone());
        }

        let mut content = Vec::new();
        guard
            .file
            .seek(SeekFrom::Start(0))
            .and_then(|_| guard.file.read_to_end(&mut content))
            .map_err(|e| Error::state_access(&self.path, e))?;
        let entries = parse_state(&content);
        debug!(path = %self.path.display(), entries = entries.len(), "Loaded state");

        self.cached = Some((stamp, entries.clone()));
        Ok(entries)
    }

    /// Replace the state file content and flush it to stable storage.
    pub fn save(&mut self, guard: &mut StateGuard, entries: &TrackedSet) -> Result<()> {
        let content = render_state(entries);
        let file = &mut guard.file;
        file.set_len(0)
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(&content))
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::state_access(&self.path, e))?;

        // The post-write stamp may not distinguish a later same-size rewrite
        // on filesystems with coarse mtimes; re-read on the next load.
        self.cached = None;
        debug!(path = %self.path.display(), entries = entries.len(), "Saved state");
        Ok(())
    }

    /// Forget the cached set so that the next load re-reads the file.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
