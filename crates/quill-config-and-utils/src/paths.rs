//! File system paths for the client.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the user's home.
const BASE_DIR_NAME: &str = ".quill";
/// Credentials document holding the persisted token pair.
const CREDENTIALS_FILE_NAME: &str = "credentials.json";
/// Central JSONL log file name.
const LOG_FILE_NAME: &str = "client.jsonl";

/// Manages file system paths for the client.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for all client files (~/.quill)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.quill`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.quill).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.quill/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the credentials file path (~/.quill/credentials.json).
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join(CREDENTIALS_FILE_NAME)
    }

    /// Get the logs directory (~/.quill/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the central log file (~/.quill/logs/client.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
