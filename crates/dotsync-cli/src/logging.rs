use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{LogFormat, LogLevel};

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level` when it is set.
pub fn init(format: LogFormat, level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level.as_directive()))?;
    let registry = tracing_subscriber::registry().with(filter_layer);

    match format {
        LogFormat::Human => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time()
                    .compact(),
            )
            .try_init()?,
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, warn};

    #[test]
    fn test_logging_init() {
        // Only one subscriber per process; a second init must fail cleanly.
        let _ = init(LogFormat::Human, LogLevel::Debug);
        assert!(init(LogFormat::Json, LogLevel::Info).is_err());

        info!(path = "a.txt", "This is an info message");
        warn!("This is a warning message");
    }
}
