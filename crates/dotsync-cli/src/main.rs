//! dotsync CLI
//!
//! Runs a single reconciliation pass, or a watch loop with `--watch`.
//!
//! Exit codes: `0` when the pass completed cleanly, `1` on a fatal or usage
//! error, `2` when a one-shot pass completed with per-entry errors.

mod cli;
mod error;
mod lifecycle;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use dotsync_core::{CancelToken, PassReport, Scheduler, SyncConfig};
use dotsync_fs::{Capabilities, apply_umask, is_root};
use tracing::{debug, info};

use cli::Cli;
use error::{CliError, Result};

/// How a successful invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    PartialErrors,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::PartialErrors => ExitCode::from(2),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_format, cli.log_level) {
        eprintln!("{}: failed to initialize logging: {}", "error".red().bold(), e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let umask = apply_umask(cli.umask);
    let cwd = std::env::current_dir()?;
    let config = build_config(&cli, &cwd, umask)?;
    config.validate()?;
    debug!(
        src = %config.source_root.display(),
        dst = %config.dest_root.display(),
        umask = format_args!("{:03o}", config.umask),
        "Configuration loaded"
    );

    let caps = Capabilities::native();
    if config.watch {
        watch(&config, &caps)?;
        return Ok(Outcome::Clean);
    }

    let report = Scheduler::new(&config, &caps).pass()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    summarize(&report);

    Ok(if report.has_partial_errors {
        Outcome::PartialErrors
    } else {
        Outcome::Clean
    })
}

fn watch(config: &SyncConfig, caps: &Capabilities) -> Result<()> {
    let cancel = CancelToken::new();
    lifecycle::install(&cancel)?;

    info!(
        src = %config.source_root.display(),
        dst = %config.dest_root.display(),
        interval_secs = config.watch_interval.as_secs(),
        "Watching for changes"
    );
    let passes = Scheduler::new(config, caps).run(&cancel);
    info!(passes, "Shutting down");
    Ok(())
}

fn summarize(report: &PassReport) {
    let stats = &report.stats;
    if report.changed {
        info!(
            copied = stats.copied,
            collected = stats.collected,
            sections = stats.sections_merged,
            pruned = stats.pruned_files + stats.pruned_sections,
            errors = stats.errors,
            "Sync complete"
        );
    } else {
        debug!(errors = stats.errors, "Already in sync");
    }
}

/// Turn parsed arguments into the engine's configuration record.
///
/// Relative paths are resolved against `cwd`.
fn build_config(cli: &Cli, cwd: &Path, umask: u32) -> Result<SyncConfig> {
    let source = match &cli.src {
        Some(src) => cwd.join(src),
        None => cwd.to_path_buf(),
    };
    let dest = match &cli.dst {
        Some(dst) => cwd.join(dst),
        None => default_destination()?,
    };

    let mut config = SyncConfig::new(source, dest);
    config.watch = cli.watch;
    config.force = cli.force;
    config.collect = cli.collect;
    config.everyone = cli.everyone;
    config.umask = umask;
    config.bin_dirs = cli.bin_dirs.clone();
    config.watch_interval = Duration::from_secs(cli.interval);
    config.full_scan_every = cli.full_scan_every;
    Ok(config)
}

fn default_destination() -> Result<PathBuf> {
    if is_root() {
        return Ok(PathBuf::from("/"));
    }
    dirs::home_dir()
        .ok_or_else(|| CliError::user("Could not determine the home directory; pass --dst"))
}
