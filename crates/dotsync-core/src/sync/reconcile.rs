//! Regular file reconciliation
//!
//! Decides per source file whether to copy it, pull the destination back
//! into the source, leave a newer destination alone, or do nothing.
//!
//! Any mismatch in size, mtime or mode reinstalls the whole file, so the
//! mode is only ever applied through the locked destination handle.

use std::fs::{self, Metadata};
use std::path::Path;

use dotsync_fs::{FileMeta, Verification, install_file, resolve_key};
use tracing::{debug, error, warn};

use super::context::SyncContext;

/// What to do with one regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Size, mtime and mode already match.
    UpToDate,
    /// Copy source over destination, forcing mode and mtime.
    Copy,
    /// Copy destination back over source.
    Collect,
    /// Destination is newer and neither collect nor force is set.
    SkipNewer,
}

/// Decide the plan from source and (symlink-followed) destination metadata.
///
/// `dest` is `None` when nothing exists at the destination path.
pub fn plan(
    source: &FileMeta,
    dest: Option<&FileMeta>,
    expected_mode: u32,
    collect: bool,
    force: bool,
) -> Plan {
    let Some(dest) = dest else {
        return Plan::Copy;
    };

    if dest.modified > source.modified {
        if collect {
            return Plan::Collect;
        }
        if !force {
            return Plan::SkipNewer;
        }
    }

    if dest.size != source.size
        || dest.modified != source.modified
        || dest.mode & 0o777 != expected_mode
    {
        Plan::Copy
    } else {
        Plan::UpToDate
    }
}

/// Reconcile one regular source file against the destination.
pub fn sync_file(ctx: &mut SyncContext<'_>, key: &str, source: &Path, meta: &Metadata) {
    let current = FileMeta::from_metadata(meta);
    let config = ctx.config;

    if config.watch {
        let unchanged = ctx.cache.refresh(source, current);
        if unchanged && !config.collect && ctx.is_tracked(key) {
            ctx.track(key);
            return;
        }
    }

    let target = resolve_key(&config.dest_root, key);
    let expected = ctx.caps.permissions.calculate_permissions(
        current.mode,
        config.umask,
        config.everyone,
    );

    // Newer-than check follows symlinks and runs without holding any lock.
    let followed = fs::metadata(&target)
        .ok()
        .filter(Metadata::is_file)
        .map(|m| FileMeta::from_metadata(&m));
    if let Some(dest) = &followed
        && dest.modified > current.modified
    {
        match plan(&current, Some(dest), expected, config.collect, config.force) {
            Plan::Collect => {
                collect(ctx, key, source, &target, &current, dest);
                return;
            }
            Plan::SkipNewer => {
                warn!(path = %target.display(), "Destination is newer than source, skipping (use --force or --collect)");
                ctx.stats.skipped_newer += 1;
                ctx.retain(key);
                return;
            }
            _ => {}
        }
    }

    let dest = match fs::symlink_metadata(&target) {
        Ok(link) if link.file_type().is_symlink() => {
            if let Err(e) = fs::remove_file(&target) {
                error!(path = %target.display(), error = %e, "Failed to remove destination symlink");
                ctx.record_error(source);
                ctx.retain(key);
                return;
            }
            debug!(path = %target.display(), "Removed destination symlink");
            None
        }
        Ok(existing) if existing.is_dir() => {
            error!(path = %target.display(), "Conflict: source is a file, destination is a directory");
            ctx.record_error(source);
            ctx.retain(key);
            return;
        }
        Ok(existing) => Some(FileMeta::from_metadata(&existing)),
        Err(_) => None,
    };

    match plan(&current, dest.as_ref(), expected, false, true) {
        Plan::UpToDate => ctx.track(key),
        _ => copy(ctx, key, source, &target, &current, expected),
    }
}

fn copy(
    ctx: &mut SyncContext<'_>,
    key: &str,
    source: &Path,
    target: &Path,
    current: &FileMeta,
    mode: u32,
) {
    debug!(src = %source.display(), dst = %target.display(), "Copying");
    match install_file(ctx.caps, source, target, current.modified, mode) {
        Ok(verification) => {
            if verification == Verification::Mismatch {
                ctx.cache.invalidate(source);
            }
            ctx.track(key);
            ctx.mark_changed();
            ctx.stats.copied += 1;
        }
        Err(e) => {
            error!(path = %target.display(), error = %e, "Failed to install file");
            ctx.record_error(source);
            ctx.retain(key);
        }
    }
}

/// Pull a newer destination back into the source, keeping the source's
/// own permission bits.
fn collect(
    ctx: &mut SyncContext<'_>,
    key: &str,
    source: &Path,
    target: &Path,
    current: &FileMeta,
    dest: &FileMeta,
) {
    debug!(src = %target.display(), dst = %source.display(), "Collecting");
    match install_file(ctx.caps, target, source, dest.modified, current.permissions()) {
        Ok(_) => {
            ctx.cache.invalidate(source);
            ctx.track(key);
            ctx.mark_changed();
            ctx.stats.collected += 1;
        }
        Err(e) => {
            error!(path = %source.display(), error = %e, "Failed to collect file");
            ctx.record_error(source);
            ctx.retain(key);
        }
    }
}
