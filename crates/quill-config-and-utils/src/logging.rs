//! Logging initialization for the client.
//!
//! Thin wrapper over the observability package so binaries have one call
//! to make. Logs go to `~/.quill/logs/client.jsonl` as structured JSONL.

use quill_observability::LogConfig;

/// Initialize the logging system for the CLI.
///
/// * `level` - Default log level (trace, debug, info, warn, error); `RUST_LOG` wins when set.
///
/// Set `QUILL_LOG_STDERR=1` to mirror logs to stderr.
pub fn init_logging(level: &str) {
    let also_stderr = std::env::var("QUILL_LOG_STDERR")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    quill_observability::init_with_config(LogConfig {
        service_name: "cli".into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        also_stderr,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
