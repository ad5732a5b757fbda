//! Watch loop
//!
//! Repeats passes on an interval until cancelled. The metadata cache lets
//! passes skip unchanged sources; every `full_scan_every` passes the cache
//! is dropped so that every file is compared against its destination again,
//! which is what reverts drift caused by other writers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use dotsync_fs::Capabilities;
use tracing::{debug, error, info};

use crate::Result;
use crate::cache::MetaCache;
use crate::config::SyncConfig;
use crate::state::StateStore;
use crate::sync::{PassReport, run_pass};

/// Granularity at which a sleeping loop notices cancellation.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared cancellation flag, set from signal handlers or other threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying flag, for registration with signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` in short slices.
    ///
    /// Returns `false` as soon as cancellation is observed, `true` if the
    /// whole duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Runs passes and owns the state that survives between them.
pub struct Scheduler<'a> {
    config: &'a SyncConfig,
    caps: &'a Capabilities,
    store: StateStore,
    cache: MetaCache,
    passes_since_full_scan: u32,
}

impl<'a> Scheduler<'a> {
    pub fn new(config: &'a SyncConfig, caps: &'a Capabilities) -> Self {
        Self {
            config,
            caps,
            store: StateStore::new(config.state_file_path(), config.umask),
            cache: MetaCache::new(),
            passes_since_full_scan: 0,
        }
    }

    /// Run one pass and advance the full-scan counter.
    ///
    /// After a fatal error the cached state is dropped so the next pass
    /// re-reads the state file from scratch.
    pub fn pass(&mut self) -> Result<PassReport> {
        let result = run_pass(self.config, self.caps, &mut self.store, &mut self.cache);
        if result.is_err() {
            self.store.invalidate();
        }
        self.advance();
        result
    }

    /// Count a pass; drop the metadata cache when the threshold is reached.
    fn advance(&mut self) {
        self.passes_since_full_scan += 1;
        if self.passes_since_full_scan >= self.config.full_scan_every {
            debug!(entries = self.cache.len(), "Dropping metadata cache for a full scan");
            self.cache.clear();
            self.passes_since_full_scan = 0;
        }
    }

    pub fn cache(&self) -> &MetaCache {
        &self.cache
    }

    /// Loop until `cancel` is set, returning the number of passes run.
    ///
    /// A pass in progress always completes; cancellation is only observed
    /// while sleeping between passes. Fatal pass errors are logged and the
    /// pass is retried after the normal interval.
    pub fn run(&mut self, cancel: &CancelToken) -> u64 {
        let mut passes = 0;
        loop {
            match self.pass() {
                Ok(report) if report.changed => {
                    info!(
                        copied = report.stats.copied,
                        collected = report.stats.collected,
                        sections = report.stats.sections_merged,
                        pruned = report.stats.pruned_files + report.stats.pruned_sections,
                        errors = report.stats.errors,
                        "Changes synchronized"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Sync pass failed"),
            }
            passes += 1;

            if !cancel.sleep(self.config.watch_interval) {
                debug!(passes, "Watch loop cancelled");
                return passes;
            }
        }
    }
}
