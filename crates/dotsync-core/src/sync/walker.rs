//! Source tree walk and per-entry dispatch
//!
//! The walk lists entries without following symlinks; the real metadata of
//! every entry is fetched separately through a following stat, so a link
//! to a file is synced as that file. Links to directories are mirrored as
//! directories but not descended into.

use std::fs::{self, Metadata};
use std::path::Path;

use dotsync_fs::io::create_dir_all;
use dotsync_fs::meta::mode_of;
use dotsync_fs::{relative_key, resolve_key};
use dotsync_sections::SectionSource;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use super::context::SyncContext;
use super::{reconcile, section};
use crate::config::STATE_FILE_NAME;
use crate::{Error, Result};

/// Version-control metadata directories never synced.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Walk the source root and dispatch every entry.
///
/// # Errors
///
/// Only a failure to stat or list the source root itself is returned;
/// every other failure is logged and counted in the context.
pub fn walk(ctx: &mut SyncContext<'_>) -> Result<()> {
    let root = ctx.config.source_root.clone();
    let mut entries = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                if e.depth() == 0 {
                    return Err(Error::source_unavailable(path, e.into()));
                }
                error!(path = %path.display(), error = %e, "Failed to read source entry");
                if let Some(key) = relative_key(&root, &path) {
                    ctx.retain(&key);
                    ctx.retain_subtree(&key);
                }
                ctx.record_error(&path);
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let is_dir_entry = entry.file_type().is_dir();
        let Some(key) = relative_key(&root, path) else {
            error!(path = %path.display(), "Skipping path that is not valid UTF-8");
            ctx.record_error(path);
            if is_dir_entry {
                entries.skip_current_dir();
            }
            continue;
        };

        if key == STATE_FILE_NAME {
            if is_dir_entry {
                error!(path = %path.display(), "State file path is a directory, skipping it");
                ctx.stats.errors += 1;
                entries.skip_current_dir();
            }
            continue;
        }

        if is_dir_entry && SKIPPED_DIRS.iter().any(|name| entry.file_name() == *name) {
            debug!(path = %path.display(), "Skipping version control directory");
            entries.skip_current_dir();
            continue;
        }

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file or broken link");
                ctx.retain(&key);
                ctx.record_error(path);
                continue;
            }
        };

        if meta.is_dir() {
            if !sync_directory(ctx, &key, &meta) && is_dir_entry {
                ctx.retain_subtree(&key);
                entries.skip_current_dir();
            }
            continue;
        }

        match SectionSource::parse(&key) {
            Some(source) => section::sync_section(ctx, &key, path, &source, &meta),
            None => reconcile::sync_file(ctx, &key, path, &meta),
        }
    }

    Ok(())
}

/// Mirror one source directory. Returns false if its subtree must be skipped.
fn sync_directory(ctx: &mut SyncContext<'_>, key: &str, meta: &Metadata) -> bool {
    let target = resolve_key(&ctx.config.dest_root, key);

    if let Ok(existing) = fs::metadata(&target)
        && !existing.is_dir()
    {
        error!(path = %target.display(), "Conflict: source is a directory, destination is not");
        ctx.stats.errors += 1;
        return false;
    }

    let mode = ctx.caps.permissions.calculate_permissions(
        mode_of(meta),
        ctx.config.umask,
        ctx.config.everyone,
    );
    if let Err(e) = create_dir_all(&target, mode) {
        error!(path = %target.display(), error = %e, "Failed to create directory");
        ctx.stats.errors += 1;
        return false;
    }
    true
}
