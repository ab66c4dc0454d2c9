// ── Blueprint packager ──
//
// Builds the upload archive: the manifest under its own file name, plus the
// firmware entry (a single file, or a directory mirrored recursively under
// its entry name). Entry names depend only on the entry path and the walked
// tree; directory listings are sorted so re-packaging is stable.

use std::collections::VecDeque;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::manifest::{Manifest, ManifestError};
use crate::source::{EntryKind, SourceStore};

/// Packaging failure. Soft failures (empty manifest, missing firmware)
/// are not errors; [`BlueprintPackager::zip`] returns `Ok(None)` for them.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to write archive: {0}")]
    Write(#[source] std::io::Error),
}

/// One entry of a produced archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub is_dir: bool,
    pub data: Vec<u8>,
}

enum Pending {
    Dir(String),
    File(String, Vec<u8>),
}

/// Zips a loaded manifest and its firmware.
#[derive(Debug, Clone, Default)]
pub struct BlueprintPackager<S> {
    source: S,
}

impl<S: SourceStore> BlueprintPackager<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Package `manifest` into ZIP bytes.
    ///
    /// Returns `Ok(None)` when the manifest content is empty or the
    /// firmware path does not exist; callers report that as a failed zip.
    pub async fn zip(&self, manifest: &Manifest) -> Result<Option<Vec<u8>>, PackageError> {
        let content = manifest.content_str()?;
        if content.trim().is_empty() {
            warn!(manifest = %manifest.path().display(), "manifest content is empty, nothing to zip");
            return Ok(None);
        }

        let mut pending = vec![Pending::File(
            manifest.filename()?.to_owned(),
            content.as_bytes().to_vec(),
        )];

        let entry_name = manifest.lua_entry_name()?;
        let fs_path = manifest.lua_fs_path()?;
        match self.stat(&fs_path).await? {
            Some(EntryKind::Directory) => {
                self.collect_dir(&fs_path, &entry_name, &mut pending).await?;
            }
            Some(EntryKind::File) => {
                let data = self.read(&fs_path).await?;
                pending.push(Pending::File(entry_name, data));
            }
            None => {
                warn!(path = %fs_path.display(), "firmware path does not exist, nothing to zip");
                return Ok(None);
            }
        }

        let archive = write_archive(pending)?;
        debug!(
            manifest = %manifest.path().display(),
            bytes = archive.len(),
            "blueprint packaged"
        );
        Ok(Some(archive))
    }

    /// Mirror `root` under `prefix`, breadth-first with a worklist.
    async fn collect_dir(
        &self,
        root: &Path,
        prefix: &str,
        pending: &mut Vec<Pending>,
    ) -> Result<(), PackageError> {
        let mut queue = VecDeque::from([(root.to_path_buf(), prefix.to_owned())]);

        while let Some((dir, folder)) = queue.pop_front() {
            pending.push(Pending::Dir(folder.clone()));
            let entries = self
                .source
                .read_dir(&dir)
                .await
                .map_err(|source| PackageError::Read {
                    path: dir.clone(),
                    source,
                })?;

            for entry in entries {
                let path = dir.join(&entry.name);
                let name = format!("{folder}/{}", entry.name);
                match entry.kind {
                    EntryKind::Directory => queue.push_back((path, name)),
                    EntryKind::File => {
                        let data = self.read(&path).await?;
                        pending.push(Pending::File(name, data));
                    }
                }
            }
        }
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<Option<EntryKind>, PackageError> {
        self.source
            .stat(path)
            .await
            .map_err(|source| PackageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, PackageError> {
        self.source
            .read(path)
            .await
            .map_err(|source| PackageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn write_archive(pending: Vec<Pending>) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in pending {
        match entry {
            Pending::Dir(name) => zip.add_directory(name, options)?,
            Pending::File(name, data) => {
                zip.start_file(name, options)?;
                zip.write_all(&data).map_err(PackageError::Write)?;
            }
        }
    }

    Ok(zip.finish()?.into_inner())
}

/// List every entry of an archive with its decompressed content.
pub fn read_entries(archive: &[u8]) -> Result<Vec<ArchiveEntry>, PackageError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let mut entries = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let is_dir = file.is_dir();
        let name = file.name().trim_end_matches('/').to_owned();
        let mut data = Vec::new();
        if !is_dir {
            file.read_to_end(&mut data).map_err(PackageError::Write)?;
        }
        entries.push(ArchiveEntry { name, is_dir, data });
    }

    Ok(entries)
}
