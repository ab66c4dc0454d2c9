// ── Blueprint manifest ──
//
// A `Manifest` references a file on disk. Content is only available after
// `load()`; every derived accessor fails with `NotLoaded` before that.

pub mod error;
pub mod schema;

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::SourceStore;
use crate::store::{self, StateStore, StoreError};

pub use error::ManifestError;
pub use schema::{BlueprintSpec, ManifestContent, is_manifest, is_v1, is_v3};

/// State key remembering the last packaged or uploaded manifest.
pub const RECENT_MANIFEST_KEY: &str = "Enapter.Storage.Manifests.Recent";

/// Persisted form of a manifest reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedManifest {
    pub uri: String,
}

#[derive(Debug, Clone)]
struct Loaded {
    text: String,
    content: ManifestContent,
}

/// A blueprint manifest file and, once loaded, its parsed content.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    loaded: Option<Loaded>,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Read, decode and parse the manifest. Re-running re-reads the file.
    ///
    /// On failure the manifest is left unloaded.
    pub async fn load<S: SourceStore>(&mut self, source: &S) -> Result<(), ManifestError> {
        self.loaded = None;
        let bytes = source
            .read(&self.path)
            .await
            .map_err(|e| ManifestError::Read {
                path: self.path.clone(),
                source: e,
            })?;
        let text = String::from_utf8(bytes).map_err(|_| ManifestError::NotUtf8 {
            path: self.path.clone(),
        })?;
        self.load_str(text)
    }

    /// Parse already-read manifest text.
    pub fn load_str(&mut self, text: impl Into<String>) -> Result<(), ManifestError> {
        self.loaded = None;
        let text = text.into();
        let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(ManifestError::Yaml)?;
        let content = ManifestContent::from_value(value)?;
        debug!(path = %self.path.display(), spec = %content.spec(), "manifest loaded");
        self.loaded = Some(Loaded { text, content });
        Ok(())
    }

    fn loaded(&self) -> Result<&Loaded, ManifestError> {
        self.loaded.as_ref().ok_or(ManifestError::NotLoaded)
    }

    // ── Content accessors ────────────────────────────────────────────

    /// Raw manifest text, exactly as read.
    pub fn content_str(&self) -> Result<&str, ManifestError> {
        Ok(&self.loaded()?.text)
    }

    pub fn content(&self) -> Result<&ManifestContent, ManifestError> {
        Ok(&self.loaded()?.content)
    }

    pub fn spec(&self) -> Result<BlueprintSpec, ManifestError> {
        Ok(self.content()?.spec())
    }

    pub fn display_name(&self) -> Result<Option<&str>, ManifestError> {
        Ok(self.content()?.display_name())
    }

    /// Firmware entry path as written in the manifest.
    pub fn lua_path(&self) -> Result<&str, ManifestError> {
        self.content()?.lua_path()
    }

    pub fn rockspec_filename(&self) -> Result<Option<&str>, ManifestError> {
        Ok(self.content()?.rockspec())
    }

    // ── Derived paths ────────────────────────────────────────────────

    /// File name of the manifest itself (e.g. `manifest.yml`).
    pub fn filename(&self) -> Result<&str, ManifestError> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ManifestError::InvalidPath {
                path: self.path.clone(),
            })
    }

    /// Directory containing the manifest.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Entry path with `./` and trailing separators removed, as used for
    /// archive entry names.
    pub fn lua_entry_name(&self) -> Result<String, ManifestError> {
        relative_entry(self.lua_path()?)
    }

    /// Filesystem location of the firmware entry (file or directory).
    pub fn lua_fs_path(&self) -> Result<PathBuf, ManifestError> {
        Ok(self.dir().join(self.lua_entry_name()?))
    }

    /// Filesystem location of the rockspec, if the manifest names one.
    pub fn rockspec_path(&self) -> Result<Option<PathBuf>, ManifestError> {
        self.rockspec_filename()?
            .map(|name| relative_entry(name).map(|rel| self.dir().join(rel)))
            .transpose()
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn to_serialized(&self) -> SerializedManifest {
        SerializedManifest {
            uri: self.path.to_string_lossy().into_owned(),
        }
    }

    /// Rebuild an unloaded manifest from its persisted form.
    pub fn from_serialized(serialized: SerializedManifest) -> Self {
        Self::new(serialized.uri)
    }
}

/// Normalize a manifest-relative path. Absolute paths and `..` segments
/// would escape the blueprint directory and are rejected.
fn relative_entry(raw: &str) -> Result<String, ManifestError> {
    let invalid = || ManifestError::InvalidLuaPath { path: raw.into() };
    let mut parts = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid());
            }
        }
    }
    if parts.is_empty() {
        return Err(invalid());
    }
    Ok(parts.join("/"))
}

// ── Recent manifest ──────────────────────────────────────────────────

/// Remember `manifest` as the most recently used one.
pub fn remember_recent(state: &dyn StateStore, manifest: &Manifest) -> Result<(), StoreError> {
    store::set_json(state, RECENT_MANIFEST_KEY, &manifest.to_serialized())
}

/// The most recently used manifest, unloaded. A corrupt entry reads as none.
pub fn recent(state: &dyn StateStore) -> Option<Manifest> {
    match store::get_json::<SerializedManifest>(state, RECENT_MANIFEST_KEY) {
        Ok(found) => found.map(Manifest::from_serialized),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable recent manifest");
            None
        }
    }
}
