//! Configuration record consumed by the engine
//!
//! `SyncConfig` is built once at startup (by the CLI or a test) and passed
//! by reference to every pass. The engine never reads flags or the
//! environment itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Name of the state file kept at the root of the source tree.
pub const STATE_FILE_NAME: &str = ".dotsync";

/// Sleep between two watch passes.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(4);

/// Watch passes between two drops of the metadata cache.
pub const DEFAULT_FULL_SCAN_EVERY: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Repeat passes until cancelled.
    pub watch: bool,
    /// Overwrite destination files even when they are newer.
    pub force: bool,
    /// Pull newer destination files back into the source.
    pub collect: bool,
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    /// Directories, relative to the source root, whose files must be executable.
    pub bin_dirs: Vec<PathBuf>,
    /// Mirror owner bits onto group and other.
    pub everyone: bool,
    /// Process umask in effect.
    pub umask: u32,
    pub watch_interval: Duration,
    pub full_scan_every: u32,
}

impl SyncConfig {
    /// A one-shot configuration with default policy.
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            watch: false,
            force: false,
            collect: false,
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            bin_dirs: Vec::new(),
            everyone: false,
            umask: 0o022,
            watch_interval: DEFAULT_WATCH_INTERVAL,
            full_scan_every: DEFAULT_FULL_SCAN_EVERY,
        }
    }

    /// Location of the state file for this source root.
    pub fn state_file_path(&self) -> PathBuf {
        self.source_root.join(STATE_FILE_NAME)
    }

    /// Check the record before the first pass.
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the source root cannot be stat'd, and
    /// `InvalidConfig` if it is not a directory, if source and destination
    /// are the same directory, or if the cache-drop threshold is zero.
    pub fn validate(&self) -> Result<()> {
        let meta = std::fs::metadata(&self.source_root)
            .map_err(|e| Error::source_unavailable(&self.source_root, e))?;
        if !meta.is_dir() {
            return Err(Error::InvalidConfig {
                message: format!("source {} is not a directory", self.source_root.display()),
            });
        }

        if same_location(&self.source_root, &self.dest_root) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "source and destination are the same ({})",
                    self.source_root.display()
                ),
            });
        }

        if self.full_scan_every == 0 {
            return Err(Error::InvalidConfig {
                message: "full scan threshold must be at least 1".to_string(),
            });
        }

        if let Some(dir) = self.bin_dirs.iter().find(|dir| dir.is_absolute()) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "bin directory {} must be relative to the source",
                    dir.display()
                ),
            });
        }

        Ok(())
    }
}

/// Compare two roots, resolving symlinks when both exist.
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
