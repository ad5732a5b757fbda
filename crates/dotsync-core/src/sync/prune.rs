//! Removal of artifacts whose source disappeared

use std::fs;
use std::io::ErrorKind;

use dotsync_fs::resolve_key;
use dotsync_sections::{SectionSource, remove_section_file};
use tracing::{debug, error};

use super::context::SyncContext;

/// Remove every artifact tracked by the previous pass but not seen now.
///
/// Plain files are deleted (directories never are); section sources have
/// their section dropped from the target file. An artifact that is already
/// gone counts as pruned. A failed removal keeps the key tracked so the
/// next pass tries again.
pub fn prune(ctx: &mut SyncContext<'_>) {
    let orphans: Vec<String> = ctx
        .old_state
        .iter()
        .filter(|key| !ctx.processed.contains(key.as_str()))
        .cloned()
        .collect();

    for key in orphans {
        match SectionSource::parse(&key) {
            Some(section) => prune_section(ctx, &key, &section),
            None => prune_file(ctx, &key),
        }
    }
}

fn prune_file(ctx: &mut SyncContext<'_>, key: &str) {
    let target = resolve_key(&ctx.config.dest_root, key);
    match fs::remove_file(&target) {
        Ok(()) => {
            debug!(path = %target.display(), "Removed orphaned file");
            ctx.mark_changed();
            ctx.stats.pruned_files += 1;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %target.display(), "Orphaned file already absent");
        }
        Err(e) => {
            error!(path = %target.display(), error = %e, "Failed to remove orphaned file");
            ctx.stats.errors += 1;
            ctx.new_state.insert(key.to_string());
        }
    }
}

fn prune_section(ctx: &mut SyncContext<'_>, key: &str, section: &SectionSource) {
    let target = resolve_key(&ctx.config.dest_root, &section.target);
    match remove_section_file(ctx.caps, &target, &section.name) {
        Ok(true) => {
            debug!(path = %target.display(), section = %section.name, "Removed orphaned section");
            ctx.mark_changed();
            ctx.stats.pruned_sections += 1;
        }
        Ok(false) => {
            debug!(path = %target.display(), section = %section.name, "Orphaned section already absent");
        }
        Err(e) => {
            error!(
                path = %target.display(),
                section = %section.name,
                error = %e,
                "Failed to remove orphaned section"
            );
            ctx.stats.errors += 1;
            ctx.new_state.insert(key.to_string());
        }
    }
}
