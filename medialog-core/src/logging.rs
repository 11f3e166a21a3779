//! Logging setup.
//!
//! The engine logs through `tracing`; this module wires the subscriber up
//! for the binaries. Output goes to a daily-rotated file under the XDG state
//! directory (`~/.local/state/medialog/`). `RUST_LOG` overrides the
//! configured level when set.

use crate::config::{Config, LoggingConfig};
use crate::error::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive; dropping it flushes pending
/// writes. Hold this for the lifetime of the process.
pub struct LoggingGuard {
    _worker: WorkerGuard,
}

/// Install the global tracing subscriber.
///
/// Degraded generators and heuristic saturation surface here at warning
/// level, so the log file is the place to look when a dashboard section
/// comes back zeroed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let state_dir = Config::state_dir();
    std::fs::create_dir_all(&state_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &state_dir, "medialog.log");
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(state_dir = %state_dir.display(), "Logging to file");
    Ok(LoggingGuard { _worker: worker })
}

/// Subscriber for tests: stdout via the test writer, `RUST_LOG` filtered.
/// Safe to call from multiple tests; only the first call installs.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
