//! Section source dispatch

use std::fs::Metadata;
use std::path::Path;

use dotsync_fs::{FileMeta, resolve_key};
use dotsync_sections::{ModePolicy, SectionSource, merge_section_file};
use tracing::{debug, error};

use super::context::SyncContext;

/// Merge one `<target>.<name>-section` source into its target file.
pub fn sync_section(
    ctx: &mut SyncContext<'_>,
    key: &str,
    source: &Path,
    section: &SectionSource,
    meta: &Metadata,
) {
    let current = FileMeta::from_metadata(meta);
    let config = ctx.config;

    if config.watch {
        let unchanged = ctx.cache.refresh(source, current);
        if unchanged && !config.collect && ctx.is_tracked(key) {
            ctx.track(key);
            return;
        }
    }

    let target = resolve_key(&config.dest_root, &section.target);
    let policy = ModePolicy {
        umask: config.umask,
        everyone: config.everyone,
    };

    match merge_section_file(ctx.caps, source, &target, &section.name, current.mode, policy) {
        Ok(changed) => {
            ctx.track(key);
            if changed {
                debug!(path = %target.display(), section = %section.name, "Merged section");
                ctx.mark_changed();
                ctx.stats.sections_merged += 1;
            }
        }
        Err(e) => {
            error!(
                path = %target.display(),
                section = %section.name,
                error = %e,
                "Failed to merge section"
            );
            ctx.record_error(source);
            ctx.retain(key);
        }
    }
}
