// ── Persistence seams ──
//
// Site metadata and device caches live in a key → JSON `StateStore`;
// credentials live in a separate `SecretStore`. Both are synchronous:
// every value is small and the file/keyring backends are local.

mod memory;

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use memory::{MemorySecretStore, MemoryStateStore};

/// Storage backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    #[error("Stored value under {key} has unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }
}

/// Key → JSON value persistence.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    /// Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Key → secret persistence, isolated from [`StateStore`].
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<SecretString>, StoreError>;
    fn set(&self, key: &str, value: &SecretString) -> Result<(), StoreError>;
    /// Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ── Typed helpers ────────────────────────────────────────────────────

pub fn get_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(|value| {
            serde_json::from_value(value).map_err(|source| StoreError::Shape {
                key: key.into(),
                source,
            })
        })
        .transpose()
}

pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Shape {
        key: key.into(),
        source,
    })?;
    store.set(key, value)
}
