//! Reconciliation engine for dotsync
//!
//! This crate keeps a destination tree convergent with a source tree:
//!
//! - **State store**: the lock-guarded set of tracked relative paths
//! - **Tree walk**: per-entry dispatch to directories, sections and files
//! - **File reconciliation**: copy, collect back, fix mode or skip newer
//! - **Pruning**: removal of artifacts whose source disappeared
//! - **Watch loop**: repeated passes with a metadata cache and periodic
//!   full scans
//!
//! # Architecture
//!
//! ```text
//!                  dotsync (CLI)
//!                        |
//!                  dotsync-core
//!                        |
//!            +-----------+-----------+
//!            |                       |
//!       dotsync-fs  <----  dotsync-sections
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dotsync_core::{Scheduler, SyncConfig};
//! use dotsync_fs::Capabilities;
//!
//! let config = SyncConfig::new("/home/me/dotfiles", "/home/me");
//! config.validate()?;
//! let caps = Capabilities::native();
//! let report = Scheduler::new(&config, &caps).pass()?;
//! println!("changed: {}", report.changed);
//! # Ok::<(), dotsync_core::Error>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod state;
pub mod sync;
pub mod watch;

pub use cache::MetaCache;
pub use config::{
    DEFAULT_FULL_SCAN_EVERY, DEFAULT_WATCH_INTERVAL, STATE_FILE_NAME, SyncConfig,
};
pub use error::{Error, Result};
pub use state::{StateGuard, StateStore, TrackedSet, parse_state, render_state};
pub use sync::{PassReport, PassStats, Plan, SyncContext, plan, run_pass};
pub use watch::{CancelToken, Scheduler};
