//! Client-local credential cache.
//!
//! Holds one optional API credential loaded from persisted storage and
//! exposes it as an observable value. `set` and `clear` change only the
//! in-memory value: nothing is written back, so a replaced credential does
//! not survive a restart. The credential is never used to authenticate
//! requests; sessions are the single source of truth for GitHub access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::watch;

/// Storage key of the saved GitHub credential.
pub const GITHUB_TOKEN_KEY: &str = "github_token";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("credential storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential storage is not a JSON object of strings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read access to previously persisted credentials.
pub trait CredentialStorage: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backing store exists but cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
}

/// JSON object file mapping keys to credential strings.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut entries: HashMap<String, String> = serde_json::from_str(&raw)?;
        Ok(entries.remove(key).filter(|v| !v.is_empty()))
    }
}

/// Observable credential cache.
pub struct TokenStore {
    tx: watch::Sender<Option<String>>,
}

impl TokenStore {
    /// Load the saved credential. Storage failures are logged and yield an
    /// empty store.
    #[must_use]
    pub fn open(storage: &dyn CredentialStorage) -> Self {
        let initial = match storage.load(GITHUB_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "saved credential unreadable, starting empty");
                None
            }
        };
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }

    /// Replace the credential in memory only.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        self.tx.send_replace(Some(token).filter(|t| !t.is_empty()));
    }

    /// Drop the credential in memory only.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;
