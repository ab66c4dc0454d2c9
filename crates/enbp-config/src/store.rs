// ── Persistent stores ──
//
// `FileStateStore` keeps the whole key space in one JSON object on disk.
// Every access re-reads the file so several handles (or processes) on the
// same path see each other's writes; mutations rewrite it through a temp
// file and a rename.
// `KeyringSecretStore` keeps each secret as its own keyring entry.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;

use enbp_core::{SecretStore, StateStore, StoreError};

use crate::ConfigError;

/// Keyring service name all secrets are stored under.
pub const SECRET_SERVICE: &str = "enbp";

// ── File-backed state ───────────────────────────────────────────────

#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    /// Open `path`, starting empty when it does not exist yet.
    ///
    /// The file is validated here so corruption surfaces before any command
    /// runs; its contents are never cached.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        read_values(&path)?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        read_values(&self.path).map_err(StoreError::backend)
    }

    /// Apply `f` to the current on-disk contents and write them back.
    ///
    /// Skips the write when `f` reports no change.
    fn mutate(&self, f: impl FnOnce(&mut Map<String, Value>) -> bool) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load()?;
        if f(&mut values) {
            write_atomic(&self.path, &values).map_err(StoreError::backend)?;
        }
        Ok(())
    }
}

fn read_values(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| ConfigError::CorruptState {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Map::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(path: &Path, values: &Map<String, Value>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(values).map_err(io::Error::other)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "state written");
    Ok(())
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.mutate(|values| {
            values.insert(key.to_owned(), value);
            true
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.mutate(|values| values.remove(key).is_some())
    }
}

// ── Keyring-backed secrets ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(SECRET_SERVICE)
    }
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, key).map_err(StoreError::backend)
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, key: &str) -> Result<Option<SecretString>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(SecretString::from(secret))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    fn set(&self, key: &str, secret: &SecretString) -> Result<(), StoreError> {
        self.entry(key)?
            .set_password(secret.expose_secret())
            .map_err(StoreError::backend)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::backend(e)),
        }
    }
}
