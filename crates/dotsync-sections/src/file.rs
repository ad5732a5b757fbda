//! Locked section updates on files shared with other owners.
//!
//! The target file is opened without truncation and held under an exclusive
//! advisory lock while it is read, merged and rewritten. Validation errors
//! are raised before anything is written, so a broken file stays as it was.

use std::fs::{self, OpenOptions};
use std::path::Path;

use dotsync_fs::io::{create_dir_all, open_for_update, read_locked, rewrite_locked};
use dotsync_fs::meta::mode_of;
use dotsync_fs::{Capabilities, Error as FsError};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::parser::split_lines;
use crate::writer::{merge, remove};

/// Mode used for parent directories created on the way to a new target.
const PARENT_DIR_MODE: u32 = 0o755;

/// How modes are derived for section targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub umask: u32,
    pub everyone: bool,
}

/// Merge the content of `source` as section `name` into `target`.
///
/// An existing target keeps its own mode, sanitized by the umask; a new
/// target gets the regular permission policy applied to `source_mode`.
/// Returns whether the content or the mode of the target changed.
pub fn merge_section_file(
    caps: &Capabilities,
    source: &Path,
    target: &Path,
    name: &str,
    source_mode: u32,
    policy: ModePolicy,
) -> Result<bool> {
    let body = fs::read(source).map_err(|e| FsError::io(source, e))?;
    let body_lines = split_lines(&body);

    let expected = match fs::metadata(target) {
        Ok(meta) if meta.is_dir() => {
            return Err(Error::TargetIsDirectory {
                path: target.to_path_buf(),
            });
        }
        Ok(meta) => mode_of(&meta) & 0o777 & !policy.umask,
        Err(_) => caps
            .permissions
            .calculate_permissions(source_mode, policy.umask, policy.everyone),
    };

    let mut file = match open_for_update(target, expected) {
        Err(e) if e.is_not_found() => {
            if let Some(parent) = target.parent() {
                create_dir_all(parent, PARENT_DIR_MODE & !policy.umask)?;
            }
            open_for_update(target, expected)?
        }
        other => other?,
    };
    caps.locker
        .lock(&file, true)
        .map_err(|e| FsError::lock(target, e))?;

    let existing = read_locked(&mut file, target)?;
    let merged = merge(&existing, &body_lines, name)?;
    let mut changed = merged.changed;
    if changed {
        debug!(path = %target.display(), section = name, "Rewriting section");
        rewrite_locked(&mut file, target, &merged.content)?;
    }

    // The handle follows a symlinked target, so its mode is the real one.
    if let Ok(meta) = file.metadata()
        && mode_of(&meta) & 0o777 != expected
    {
        match caps.permissions.apply(&file, expected) {
            Ok(()) => changed = true,
            Err(e) => warn!(path = %target.display(), error = %e, "Failed to chmod"),
        }
    }

    Ok(changed)
}

/// Remove section `name` from `target`.
///
/// A missing target or a target without the section is not an error and
/// reports `false`.
pub fn remove_section_file(caps: &Capabilities, target: &Path, name: &str) -> Result<bool> {
    let mut file = match OpenOptions::new().read(true).write(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(FsError::io(target, e).into()),
    };
    caps.locker
        .lock(&file, true)
        .map_err(|e| FsError::lock(target, e))?;

    let existing = read_locked(&mut file, target)?;
    let removed = remove(&existing, name)?;
    if removed.changed {
        debug!(path = %target.display(), section = name, "Removing section");
        rewrite_locked(&mut file, target, &removed.content)?;
    }
    Ok(removed.changed)
}
