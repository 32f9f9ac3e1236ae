//! # Observability
//!
//! Centralized logging for the Quill client crates.
//!
//! Crates are **log producers**. They use plain `tracing` macros and never
//! decide where output goes. The binary calls [`init_with_config`] once at
//! startup; after that every event lands in a central JSONL file
//! (`~/.quill/logs/client.jsonl` by default) and, optionally, on stderr.
//!
//! Session code handles bearer tokens and passwords. Any structured field
//! whose name or value looks like a credential is replaced with
//! `[REDACTED]` before it is written, so a stray `token = %t` never ends up
//! on disk.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     quill_observability::init_with_config(quill_observability::LogConfig {
//!         service_name: "cli".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!
//!     tracing::info!("ready");
//! }
//! ```

mod json_layer;
mod redact;
mod sink;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};
pub use redact::{is_sensitive_key, redact_value};
pub use sink::{default_log_path, CentralLogWriter, WriterFactory};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the emitting service (e.g., "cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.quill/logs/client.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings for the named service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the central log file cannot be opened the JSON layer is skipped and
/// logging falls back to stderr only; a client must keep working on a
/// read-only home directory.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let log_path = config.log_path.clone().or_else(default_log_path);

    let (json_layer, open_error) = match log_path.as_ref().map(CentralLogWriter::new) {
        Some(Ok(writer)) => (
            Some(JsonLayer::new(
                config.service_name.clone(),
                WriterFactory::new(writer),
            )),
            None,
        ),
        Some(Err(e)) => (None, Some(e.to_string())),
        None => (None, None),
    };

    // Without a file sink, stderr is the only place logs can go.
    let stderr_enabled = config.also_stderr || json_layer.is_none();
    let stderr_layer = stderr_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
    });

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let _ = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(filter())))
        .with(stderr_layer.map(|l| l.with_filter(filter())))
        .try_init();

    match (open_error, log_path) {
        (Some(error), Some(path)) => {
            tracing::warn!(log_path = %path.display(), error = %error, "log file unavailable, using stderr")
        }
        (None, Some(path)) => tracing::debug!(log_path = %path.display(), "observability initialized"),
        _ => {}
    }
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};
