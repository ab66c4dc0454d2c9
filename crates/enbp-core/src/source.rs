// ── Blueprint source access ──
//
// The manifest and packager only need three primitives: read a whole file,
// tell files from directories, and list a directory. `LocalFs` provides them
// over tokio::fs; other backends (archives, remote workspaces) plug in here.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

/// Kind of a source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Read-only access to blueprint sources.
pub trait SourceStore: Send + Sync {
    /// Read the full contents of a file.
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send;

    /// Classify a path. `Ok(None)` when nothing exists there.
    fn stat(&self, path: &Path) -> impl Future<Output = io::Result<Option<EntryKind>>> + Send;

    /// List a directory. Entries that are neither files nor directories
    /// are skipped.
    fn read_dir(&self, path: &Path) -> impl Future<Output = io::Result<Vec<DirEntry>>> + Send;
}

/// Local filesystem backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl SourceStore for LocalFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn stat(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(meta) if meta.is_file() => Ok(Some(EntryKind::File)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path: PathBuf = entry.path();
            // Follow symlinks so linked sources are packaged as content.
            let Some(kind) = self.stat(&path).await? else {
                tracing::debug!(path = %path.display(), "skipping special file");
                continue;
            };
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %path.display(), "skipping non-UTF-8 file name");
                continue;
            };
            entries.push(DirEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
