//! Core types, configuration, and utilities for the Quill client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_EXPIRY_LEEWAY_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
