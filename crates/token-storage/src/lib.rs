//! Credential storage for the Quill client.
//!
//! The persisted state is two strings, `accessToken` and `refreshToken`.
//! [`TokenStore`] is the only component that reads or writes them; it keeps
//! the pair consistent on top of any [`SecureStorage`] backend:
//! - **File**: a private JSON document under `~/.quill` ([`FileStorage`])
//! - **Memory**: process-local, for tests ([`MemoryStorage`])

mod file;
mod keys;
mod memory;
mod store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use store::{CredentialPair, StoredTokens, TokenStore};
pub use traits::SecureStorage;

use quill_config_and_utils::Paths;
use std::sync::Arc;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default storage backend: the credentials document under `paths`.
pub fn create_storage(paths: &Paths) -> Arc<dyn SecureStorage> {
    Arc::new(FileStorage::new(paths.credentials_file()))
}

/// Create a [`TokenStore`] over the default storage backend.
pub fn create_token_store(paths: &Paths) -> TokenStore {
    TokenStore::new(create_storage(paths))
}
