//! Credential pair persistence.

use crate::{SecureStorage, StorageKeys, StorageResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The two bearer tokens issued by the backend.
///
/// A pair is either fully stored or fully absent; [`TokenStore`] never
/// persists one half on its own except when refresh rewrites the access token.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Raw halves as found on disk, possibly incomplete.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    pub fn is_partial(&self) -> bool {
        self.access_token.is_some() != self.refresh_token.is_some()
    }

    /// The complete pair, if both halves are present.
    pub fn into_pair(self) -> Option<CredentialPair> {
        match (self.access_token, self.refresh_token) {
            (Some(access_token), Some(refresh_token)) => Some(CredentialPair {
                access_token,
                refresh_token,
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Sole reader and writer of the persisted credential pair.
pub struct TokenStore {
    storage: Arc<dyn SecureStorage>,
    lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Read the stored pair. Returns `None` unless both halves are present.
    pub fn load(&self) -> StorageResult<Option<CredentialPair>> {
        let parts = self.load_parts()?;
        if parts.is_partial() {
            debug!("Stored credentials are incomplete, treating as absent");
        }
        Ok(parts.into_pair())
    }

    /// Read both halves independently, for startup recovery.
    pub fn load_parts(&self) -> StorageResult<StoredTokens> {
        let _guard = self.lock.lock();
        Ok(StoredTokens {
            access_token: non_empty(self.storage.get(StorageKeys::ACCESS_TOKEN)?),
            refresh_token: non_empty(self.storage.get(StorageKeys::REFRESH_TOKEN)?),
        })
    }

    /// Persist both tokens as one write.
    pub fn save(&self, pair: &CredentialPair) -> StorageResult<()> {
        let _guard = self.lock.lock();
        self.storage.set_many(&[
            (StorageKeys::ACCESS_TOKEN, pair.access_token.as_str()),
            (StorageKeys::REFRESH_TOKEN, pair.refresh_token.as_str()),
        ])?;
        debug!("Credential pair saved");
        Ok(())
    }

    /// Replace the access token after a refresh. The refresh token is kept.
    pub fn save_access_token(&self, access_token: &str) -> StorageResult<()> {
        let _guard = self.lock.lock();
        if !self.storage.has(StorageKeys::REFRESH_TOKEN)? {
            warn!("Saving renewed access token without a stored refresh token");
        }
        self.storage.set(StorageKeys::ACCESS_TOKEN, access_token)
    }

    /// Remove both tokens.
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.lock.lock();
        self.storage.delete_many(&StorageKeys::CREDENTIAL_PAIR)?;
        debug!("Credential pair cleared");
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
