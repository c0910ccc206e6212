//! Logging bootstrap and failure flattening.
//!
//! Installs the single-line JSON encoder on a `tracing-subscriber` registry:
//! a console layer always, plus a daily-rolling non-blocking file layer when
//! a log directory is configured.

mod json_format;

pub use json_format::JsonLineFormat;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{FixedOffset, Offset, Utc};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Bootstrap options for [`init_logging`].
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Directory for daily-rolling log files; `None` disables file output.
    pub log_dir: Option<PathBuf>,
    /// File name prefix for rolled files.
    pub file_prefix: String,
    /// Fixed offset for record timestamps.
    pub timezone: FixedOffset,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_filter: "info,reqtrail_core=debug,reqtrail_gateway=debug".to_string(),
            log_dir: None,
            file_prefix: "reqtrail".to_string(),
            timezone: Utc.fix(),
        }
    }
}

/// Install the global subscriber with the JSON line encoder.
///
/// Returns the file writer guard when file output is enabled; the guard must
/// be kept alive for the duration of the program. Installing over an
/// existing subscriber is an error, not a panic.
pub fn init_logging(options: LoggingOptions) -> anyhow::Result<Option<WorkerGuard>> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    let console_layer = fmt::layer().event_format(JsonLineFormat::with_timezone(options.timezone));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(dir) = options.log_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(options.file_prefix.as_str())
            .filename_suffix("log")
            .build(&dir)
            .context("failed to create rolling file appender")?;
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .event_format(JsonLineFormat::with_timezone(options.timezone));

        registry
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
        Ok(Some(guard))
    } else {
        registry
            .try_init()
            .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
        Ok(None)
    }
}

/// Flatten an error and its sources into a newline-joined string, one frame
/// per line. Used to attach failures to error-level events so the encoder
/// can lift them into the `stackTrace` field.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut frames = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        frames.push(cause.to_string());
        source = cause.source();
    }
    frames.join("\n")
}
