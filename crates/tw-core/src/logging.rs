//! Logging initialization using the `tracing` ecosystem.
//!
//! Status lines for catalog fetches, connects, per-channel subscribe outcomes
//! and reconnect countdowns are the connector's only observability surface,
//! so every module logs through `tracing` with a `[exchange]` prefix.
//!
//! - Console output (colored, human-readable)
//! - Optional file output (daily rotation via `tracing-appender`, JSON lines)
//! - Level from `RUST_LOG`, falling back to an explicit default

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how to write logs.
#[derive(Debug, Clone, Default)]
pub struct LogOptions<'a> {
    /// Default level if `RUST_LOG` is not set (e.g. `"info"`).
    pub level: &'a str,
    /// Optional directory for daily-rotating log files.
    pub dir: Option<&'a str>,
    /// File name prefix (e.g. `"tw-runner"`).
    pub file_prefix: &'a str,
    /// Write the file layer as JSON lines instead of plain text.
    pub json_file: bool,
}

/// Initialize the global tracing subscriber.
///
/// Call once at program start. Returns the file writer guard when a log
/// directory is configured; it must be kept alive for buffered lines to be
/// flushed on exit.
pub fn init_logging(opts: &LogOptions<'_>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.level));

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let Some(dir) = opts.dir else {
        tracing_subscriber::registry().with(env_filter).with(console_layer).init();
        return None;
    };

    let appender = tracing_appender::rolling::daily(dir, opts.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    if opts.json_file {
        let file_layer = fmt::layer().json().with_writer(writer).with_target(true);
        tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).init();
    } else {
        let file_layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
        tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).init();
    }

    Some(guard)
}
