//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dotsync_core::DEFAULT_FULL_SCAN_EVERY;

/// dotsync - Keep a destination tree in sync with a source tree of dotfiles
///
/// Files under the source are copied to the same relative path under the
/// destination. Files named `<target>.<name>-section` are merged as a named
/// block into `<target>` instead. Paths that disappear from the source are
/// removed from the destination on the next pass.
#[derive(Parser, Debug)]
#[command(name = "dotsync")]
#[command(author, version, about)]
pub struct Cli {
    /// Source directory (defaults to the current directory)
    #[arg(long, env = "DOTSYNC_SRC", value_name = "DIR")]
    pub src: Option<PathBuf>,

    /// Destination directory (defaults to the home directory, or / as root)
    #[arg(long, env = "DOTSYNC_DST", value_name = "DIR")]
    pub dst: Option<PathBuf>,

    /// Keep running and re-sync on an interval
    #[arg(short, long, env = "DOTSYNC_WATCH")]
    pub watch: bool,

    /// Overwrite destination files even when they are newer
    #[arg(short, long, env = "DOTSYNC_FORCE")]
    pub force: bool,

    /// Pull newer destination files back into the source
    #[arg(short, long, env = "DOTSYNC_COLLECT")]
    pub collect: bool,

    /// Process umask, in octal (defaults to the current umask)
    #[arg(long, env = "DOTSYNC_UMASK", value_name = "OCTAL", value_parser = parse_octal)]
    pub umask: Option<u32>,

    /// Mirror owner permission bits onto group and other
    #[arg(short, long, env = "DOTSYNC_EVERYONE")]
    pub everyone: bool,

    /// Directory under the source whose files must be executable (repeatable)
    #[arg(
        long = "bindir",
        env = "DOTSYNC_BINDIR",
        value_name = "DIR",
        value_delimiter = ','
    )]
    pub bin_dirs: Vec<PathBuf>,

    /// Seconds to sleep between watch passes
    #[arg(
        long,
        env = "DOTSYNC_INTERVAL",
        value_name = "SECS",
        default_value_t = 4,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Watch passes between two full rescans
    #[arg(
        long,
        env = "DOTSYNC_FULL_SCAN_EVERY",
        value_name = "N",
        default_value_t = DEFAULT_FULL_SCAN_EVERY,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub full_scan_every: u32,

    /// Print the pass report as JSON (one-shot mode)
    #[arg(long)]
    pub json: bool,

    /// Log output format
    #[arg(long, env = "DOTSYNC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,

    /// Minimum log level (RUST_LOG overrides)
    #[arg(long, env = "DOTSYNC_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact lines without timestamps
    Human,
    /// Full lines with timestamps
    Text,
    /// One JSON object per line
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn parse_octal(value: &str) -> Result<u32, String> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    let parsed = u32::from_str_radix(digits, 8)
        .map_err(|_| format!("'{}' is not an octal number", value))?;
    if parsed > 0o777 {
        return Err(format!("umask {:o} is out of range (max 777)", parsed));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["dotsync"]).unwrap();
        assert_eq!(cli.src, None);
        assert!(!cli.watch);
        assert_eq!(cli.umask, None);
        assert_eq!(cli.interval, 4);
        assert_eq!(cli.full_scan_every, DEFAULT_FULL_SCAN_EVERY);
        assert_eq!(cli.log_format, LogFormat::Human);
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn parse_flags() {
        let cli = Cli::try_parse_from([
            "dotsync",
            "--src",
            "/repo",
            "--dst",
            "/target",
            "-w",
            "--force",
            "--collect",
            "--umask",
            "077",
            "--bindir",
            "bin",
            "--bindir",
            ".local/bin",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.src, Some(PathBuf::from("/repo")));
        assert_eq!(cli.dst, Some(PathBuf::from("/target")));
        assert!(cli.watch && cli.force && cli.collect);
        assert_eq!(cli.umask, Some(0o077));
        assert_eq!(
            cli.bin_dirs,
            vec![PathBuf::from("bin"), PathBuf::from(".local/bin")]
        );
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn parse_octal_values() {
        assert_eq!(parse_octal("022"), Ok(0o022));
        assert_eq!(parse_octal("0o077"), Ok(0o077));
        assert_eq!(parse_octal("0"), Ok(0));
        assert!(parse_octal("9").is_err());
        assert!(parse_octal("1000").is_err());
        assert!(parse_octal("").is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(Cli::try_parse_from(["dotsync", "--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["dotsync", "--full-scan-every", "0"]).is_err());
    }
}
