//! One reconciliation pass
//!
//! A pass locks the state file, loads the tracked set, walks the source
//! tree dispatching every entry, prunes what disappeared, and saves the new
//! tracked set if anything changed. The state lock is held for the whole
//! pass; destination files are locked only while each one is written.

mod context;
mod prune;
mod reconcile;
mod section;
mod walker;

pub use context::{PassReport, PassStats, SyncContext};
pub use reconcile::{Plan, plan};

use std::fs;
use std::io;

use dotsync_fs::Capabilities;
use tracing::{debug, warn};

use crate::cache::MetaCache;
use crate::config::SyncConfig;
use crate::state::StateStore;
use crate::{Error, Result};

/// Run a single pass.
///
/// # Errors
///
/// Returns a fatal error when the source root is unavailable or the state
/// file cannot be locked, read or written. Per-entry failures never abort
/// the pass; they show up in [`PassReport::has_partial_errors`].
pub fn run_pass(
    config: &SyncConfig,
    caps: &Capabilities,
    store: &mut StateStore,
    cache: &mut MetaCache,
) -> Result<PassReport> {
    let source = &config.source_root;
    let meta = fs::metadata(source).map_err(|e| Error::source_unavailable(source, e))?;
    if !meta.is_dir() {
        return Err(Error::source_unavailable(
            source,
            io::Error::new(io::ErrorKind::NotADirectory, "source root is not a directory"),
        ));
    }

    let mut guard = store.lock(caps)?;
    debug!(path = %guard.path().display(), "Acquired state lock");

    if let Err(e) = caps.ownership.ensure_ownership(guard.file(), source) {
        warn!(path = %guard.path().display(), error = %e, "Failed to transfer state file ownership");
    }

    let old_state = store.load(&mut guard)?;

    for dir in &config.bin_dirs {
        let fixed = caps
            .permissions
            .ensure_executable_bits(&source.join(dir), config.umask);
        if fixed > 0 {
            debug!(dir = %dir.display(), files = fixed, "Added executable bits");
        }
    }

    let mut ctx = SyncContext::new(config, caps, &old_state, cache);
    walker::walk(&mut ctx)?;
    prune::prune(&mut ctx);
    let (new_state, report) = ctx.finish();

    if report.changed {
        store.save(&mut guard, &new_state)?;
    }
    debug!(
        changed = report.changed,
        errors = report.stats.errors,
        "Pass finished"
    );
    Ok(report)
}
