//! Error types for dotsync-core

use std::path::PathBuf;

/// Result type for dotsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dotsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The state file could not be locked; the pass cannot start
    #[error("Failed to lock state file {path}: {source}")]
    StateLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state file could not be opened, read or written
    #[error("Failed to access state file {path}: {source}")]
    StateAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source root cannot be stat'd or enumerated
    #[error("Source directory {path} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration record
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from dotsync-fs
    #[error(transparent)]
    Fs(#[from] dotsync_fs::Error),

    /// Section error from dotsync-sections
    #[error(transparent)]
    Sections(#[from] dotsync_sections::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn state_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StateAccess {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Whether the error aborts a whole pass rather than a single entry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StateLock { .. } | Self::StateAccess { .. } | Self::SourceUnavailable { .. }
        )
    }
}
