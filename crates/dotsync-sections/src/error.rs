//! Error types for dotsync-sections

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] dotsync_fs::Error),

    #[error("Found opening tag for section '{name}' at line {line} but no closing tag")]
    UnclosedSection { name: String, line: usize },

    #[error("Found orphaned closing tag for section '{name}' at line {line}")]
    OrphanedEnd { name: String, line: usize },

    #[error("Conflict: target {path} is a directory")]
    TargetIsDirectory { path: PathBuf },
}

impl Error {
    /// Whether the error comes from malformed markers in the target file.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::UnclosedSection { .. } | Self::OrphanedEnd { .. })
    }
}
