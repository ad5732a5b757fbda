//! Per-pass bookkeeping

use std::collections::HashSet;
use std::path::Path;

use dotsync_fs::Capabilities;
use serde::{Deserialize, Serialize};

use crate::cache::MetaCache;
use crate::config::SyncConfig;
use crate::state::TrackedSet;

/// Counters of what one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Files copied from source to destination (including mode-only fixes).
    pub copied: usize,
    /// Files pulled back from destination to source.
    pub collected: usize,
    pub sections_merged: usize,
    pub pruned_files: usize,
    pub pruned_sections: usize,
    /// Files left alone because the destination was newer.
    pub skipped_newer: usize,
    /// Per-entry failures.
    pub errors: usize,
}

/// Outcome of one pass as seen by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Something in the destination, the source or the tracked set changed.
    pub changed: bool,
    /// At least one entry failed and was skipped.
    pub has_partial_errors: bool,
    pub stats: PassStats,
}

/// Mutable state threaded through the walk and the pruner.
pub struct SyncContext<'a> {
    pub config: &'a SyncConfig,
    pub caps: &'a Capabilities,
    pub old_state: &'a TrackedSet,
    pub new_state: TrackedSet,
    /// Keys seen by this pass, whether or not they were applied.
    pub processed: HashSet<String>,
    pub cache: &'a mut MetaCache,
    pub changed: bool,
    pub stats: PassStats,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        config: &'a SyncConfig,
        caps: &'a Capabilities,
        old_state: &'a TrackedSet,
        cache: &'a mut MetaCache,
    ) -> Self {
        Self {
            config,
            caps,
            old_state,
            new_state: TrackedSet::new(),
            processed: HashSet::new(),
            cache,
            changed: false,
            stats: PassStats::default(),
        }
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.old_state.contains(key)
    }

    /// `key` was applied or confirmed up to date.
    pub fn track(&mut self, key: &str) {
        self.processed.insert(key.to_string());
        self.new_state.insert(key.to_string());
    }

    /// `key` was seen but not applied. It stays tracked if it already was,
    /// so a failure never turns into a prune.
    pub fn retain(&mut self, key: &str) {
        self.processed.insert(key.to_string());
        if self.old_state.contains(key) {
            self.new_state.insert(key.to_string());
        }
    }

    /// Keep every tracked key below the directory `key`, whose content this
    /// pass could not visit.
    pub fn retain_subtree(&mut self, key: &str) {
        let prefix = format!("{key}/");
        let below: Vec<String> = self
            .old_state
            .range(prefix.clone()..)
            .take_while(|tracked| tracked.starts_with(&prefix))
            .cloned()
            .collect();
        for tracked in below {
            self.processed.insert(tracked.clone());
            self.new_state.insert(tracked);
        }
    }

    /// Count a per-entry failure and make the next pass retry `source`.
    pub fn record_error(&mut self, source: &Path) {
        self.stats.errors += 1;
        self.cache.invalidate(source);
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Close the pass, returning the new tracked set and the report.
    ///
    /// A tracked set that differs from the previous one counts as a change,
    /// so it is always persisted.
    pub fn finish(self) -> (TrackedSet, PassReport) {
        let changed = self.changed || self.new_state != *self.old_state;
        let report = PassReport {
            changed,
            has_partial_errors: self.stats.errors > 0,
            stats: self.stats,
        };
        (self.new_state, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(keys: &[&str]) -> TrackedSet {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn retain_keeps_only_previously_tracked_keys() {
        let config = SyncConfig::new("/src", "/dst");
        let caps = Capabilities::native();
        let old = tracked(&["kept"]);
        let mut cache = MetaCache::new();
        let mut ctx = SyncContext::new(&config, &caps, &old, &mut cache);

        ctx.retain("kept");
        ctx.retain("new");
        assert!(ctx.processed.contains("new"));

        let (state, report) = ctx.finish();
        assert_eq!(state, tracked(&["kept"]));
        assert!(!report.changed);
    }

    #[test]
    fn retain_subtree_stops_at_sibling_prefixes() {
        let config = SyncConfig::new("/src", "/dst");
        let caps = Capabilities::native();
        let old = tracked(&["bin/a", "bin/sub/b", "bin2/c", "binx"]);
        let mut cache = MetaCache::new();
        let mut ctx = SyncContext::new(&config, &caps, &old, &mut cache);

        ctx.retain_subtree("bin");
        assert_eq!(ctx.new_state, tracked(&["bin/a", "bin/sub/b"]));
    }

    #[test]
    fn new_key_counts_as_change() {
        let config = SyncConfig::new("/src", "/dst");
        let caps = Capabilities::native();
        let old = TrackedSet::new();
        let mut cache = MetaCache::new();
        let mut ctx = SyncContext::new(&config, &caps, &old, &mut cache);

        ctx.track("a");
        let (_, report) = ctx.finish();
        assert!(report.changed);
        assert!(!report.has_partial_errors);
    }
}
