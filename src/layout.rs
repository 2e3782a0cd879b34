// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! On-device directory layout.
//!
//! ```text
//! <root>/
//! ├── DiaryMedia/              durable originals        (counted toward the cap)
//! ├── Thumbnails/              durable ingest thumbnails (counted toward the cap)
//! ├── ThumbCache/              list renditions           (reclaimable)
//! ├── DisplayCache/            display renditions        (reclaimable)
//! ├── media_access_log.json
//! └── media_cache_state.json
//! ```
//!
//! Every file the cache knows about is addressed by a `/`-separated path
//! relative to the root. [`StorageLayout::resolve`] is the only way such a
//! path becomes a filesystem path, so escaping the root is impossible.
//! Operations on media go through [`StorageLayout::resolve_durable`], which
//! additionally confines them to the two capped directories.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::error::MediaError;
use crate::media::{MediaId, MediaKind};

pub const ORIGINALS_DIR: &str = "DiaryMedia";
pub const THUMBNAILS_DIR: &str = "Thumbnails";
pub const LIST_CACHE_DIR: &str = "ThumbCache";
pub const DISPLAY_CACHE_DIR: &str = "DisplayCache";
pub const ACCESS_LOG_FILE: &str = "media_access_log.json";
pub const CACHE_STATE_FILE: &str = "media_cache_state.json";

/// Directory structure rooted at the app-private storage directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn originals_dir(&self) -> PathBuf {
        self.root.join(ORIGINALS_DIR)
    }

    #[must_use]
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(THUMBNAILS_DIR)
    }

    #[must_use]
    pub fn list_cache_dir(&self) -> PathBuf {
        self.root.join(LIST_CACHE_DIR)
    }

    #[must_use]
    pub fn display_cache_dir(&self) -> PathBuf {
        self.root.join(DISPLAY_CACHE_DIR)
    }

    #[must_use]
    pub fn access_log_file(&self) -> PathBuf {
        self.root.join(ACCESS_LOG_FILE)
    }

    #[must_use]
    pub fn cache_state_file(&self) -> PathBuf {
        self.root.join(CACHE_STATE_FILE)
    }

    /// The two directories whose contents count toward the storage cap.
    #[must_use]
    pub fn durable_dirs(&self) -> [PathBuf; 2] {
        [self.originals_dir(), self.thumbnails_dir()]
    }

    /// The two reclaimable rendition directories.
    #[must_use]
    pub fn rendition_dirs(&self) -> [PathBuf; 2] {
        [self.list_cache_dir(), self.display_cache_dir()]
    }

    #[must_use]
    pub fn original_path(id: &MediaId, kind: MediaKind) -> String {
        format!("{ORIGINALS_DIR}/{}", id.original_file_name(kind))
    }

    #[must_use]
    pub fn thumbnail_path(id: &MediaId) -> String {
        format!("{THUMBNAILS_DIR}/{}", id.thumbnail_file_name())
    }

    /// Create every directory of the layout.
    pub async fn ensure_dirs(&self) -> Result<(), MediaError> {
        for dir in self.durable_dirs().into_iter().chain(self.rendition_dirs()) {
            create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Turn a relative path into an absolute one under the root.
    ///
    /// Rejects empty, absolute, and parent-escaping paths.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        if relative.is_empty() {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        let candidate = Path::new(relative);
        let mut resolved = self.root.clone();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(MediaError::InvalidPath(relative.to_string())),
            }
        }
        if resolved == self.root {
            return Err(MediaError::InvalidPath(relative.to_string()));
        }
        Ok(resolved)
    }

    /// [`resolve`](Self::resolve), restricted to files inside `DiaryMedia/`
    /// or `Thumbnails/`.
    ///
    /// Anything else (rendition caches, bookkeeping files, stray top-level
    /// directories) is never counted toward the cap, so media may not live
    /// there.
    pub fn resolve_durable(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let resolved = self.resolve(relative)?;
        let durable = self
            .durable_dirs()
            .iter()
            .any(|dir| resolved.starts_with(dir) && resolved != *dir);
        if durable {
            Ok(resolved)
        } else {
            Err(MediaError::InvalidPath(relative.to_string()))
        }
    }

    /// Inverse of [`resolve`](Self::resolve) for paths found by listing a directory.
    #[must_use]
    pub fn relative_of(&self, absolute: &Path) -> Option<String> {
        let rel = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

/// Flatten a relative path into a single file name for the rendition tiers.
///
/// `%`, `_`, spaces and backslashes are percent-escaped, then `/` becomes
/// `_`. Names not already ending in `.jpg` get a `%.jpg` suffix, which no
/// escaped name can end with. Distinct paths always map to distinct names.
#[must_use]
pub fn flatten_file_name(relative: &str) -> String {
    let mut flat = String::with_capacity(relative.len() + 8);
    for c in relative.chars() {
        match c {
            '%' => flat.push_str("%25"),
            '_' => flat.push_str("%5F"),
            ' ' => flat.push_str("%20"),
            '\\' => flat.push_str("%5C"),
            '/' => flat.push('_'),
            other => flat.push(other),
        }
    }
    if !flat.ends_with(".jpg") {
        flat.push_str("%.jpg");
    }
    flat
}

pub(crate) async fn create_dir_all(dir: &Path) -> Result<(), MediaError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| MediaError::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })
}

/// Write `bytes` to `path` via a sibling temp file and a rename, creating the
/// parent directory first. Readers never observe a half-written file.
///
/// Each call gets its own temp file, so concurrent writers of one path never
/// clobber each other's partial output; the last rename wins.
pub(crate) async fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), MediaError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp);

    let write_err = |source| MediaError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }
    Ok(())
}

/// Remove a file; a missing file is not an error. Returns whether it existed.
pub(crate) async fn remove_file_if_exists(path: &Path) -> Result<bool, MediaError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(MediaError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A regular file found while walking a directory tree.
#[derive(Debug, Clone)]
pub(crate) struct ListedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_ms: u64,
}

/// Recursively list regular files under `dir`. A missing directory is empty;
/// unreadable entries are skipped.
pub(crate) async fn list_files(dir: &Path) -> Vec<ListedFile> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(dir = %current.display(), error = %e, "Failed to list directory");
                }
                continue;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %current.display(), error = %e, "Failed to read directory entry");
                    break;
                }
            };
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if meta.is_dir() {
                pending.push(entry.path());
            } else if meta.is_file() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    continue;
                }
                let modified_ms = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                files.push(ListedFile {
                    path,
                    size_bytes: meta.len(),
                    modified_ms,
                });
            }
        }
    }

    files
}

/// Sum of file sizes under `dirs`.
pub(crate) async fn total_bytes(dirs: &[PathBuf]) -> u64 {
    let mut total = 0;
    for dir in dirs {
        total += list_files(dir).await.iter().map(|f| f.size_bytes).sum::<u64>();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_accepts_nested_relative_paths() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.resolve("DiaryMedia/a.jpg").unwrap(),
            PathBuf::from("/data/DiaryMedia/a.jpg")
        );
        assert_eq!(
            layout.resolve("./DiaryMedia/2024/a.jpg").unwrap(),
            PathBuf::from("/data/DiaryMedia/2024/a.jpg")
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let layout = StorageLayout::new("/data");
        assert!(layout.resolve("../etc/passwd").is_err());
        assert!(layout.resolve("DiaryMedia/../../x").is_err());
        assert!(layout.resolve("/etc/passwd").is_err());
        assert!(layout.resolve("").is_err());
        assert!(layout.resolve(".").is_err());
    }

    #[test]
    fn test_relative_of_round_trips() {
        let layout = StorageLayout::new("/data");
        let abs = layout.resolve("Thumbnails/x_thumb.jpg").unwrap();
        assert_eq!(layout.relative_of(&abs).as_deref(), Some("Thumbnails/x_thumb.jpg"));
        assert_eq!(layout.relative_of(Path::new("/elsewhere/x.jpg")), None);
    }

    #[test]
    fn test_resolve_durable_confines_to_capped_dirs() {
        let layout = StorageLayout::new("/data");
        assert!(layout.resolve_durable("DiaryMedia/a.jpg").is_ok());
        assert!(layout.resolve_durable("./Thumbnails/x_thumb.jpg").is_ok());
        assert!(layout.resolve_durable("DiaryMedia/remote/2024/a.jpg").is_ok());

        for path in [
            "remote/1.jpg",
            "ThumbCache/a.jpg",
            "DisplayCache/a.jpg",
            "media_access_log.json",
            "media_cache_state.json",
            "DiaryMedia",
            "DiaryMediaX/a.jpg",
            "../DiaryMedia/a.jpg",
        ] {
            assert!(
                matches!(layout.resolve_durable(path), Err(MediaError::InvalidPath(_))),
                "{path} accepted"
            );
        }
    }

    #[test]
    fn test_flatten_file_name() {
        assert_eq!(flatten_file_name("DiaryMedia/a b.jpg"), "DiaryMedia_a%20b.jpg");
        assert_eq!(flatten_file_name("DiaryMedia/clip.mp4"), "DiaryMedia_clip.mp4%.jpg");
        assert!(!flatten_file_name("a/b/c/d.png").contains('/'));
    }

    #[test]
    fn test_flatten_keeps_lookalike_paths_apart() {
        let names = [
            "DiaryMedia/a b.jpg",
            "DiaryMedia/a_b.jpg",
            "DiaryMedia_a/b.jpg",
            "DiaryMedia/a/b.jpg",
            "DiaryMedia/x",
            "DiaryMedia/x.jpg",
            "DiaryMedia/x%.jpg",
            "DiaryMedia/x%25.jpg",
        ]
        .map(flatten_file_name);
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "{names:?}");
    }

    #[test]
    fn test_media_paths() {
        let id = MediaId::new();
        assert!(StorageLayout::original_path(&id, MediaKind::Video).starts_with("DiaryMedia/"));
        assert!(StorageLayout::thumbnail_path(&id).starts_with("Thumbnails/"));
    }

    #[tokio::test]
    async fn test_atomic_write_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/file.bin");
        write_file_atomic(&target, b"hello").await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"hello");

        let mut entries = tokio::fs::read_dir(dir.path().join("a/b")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![std::ffi::OsString::from("file.bin")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_atomic_writes_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let target = std::sync::Arc::new(dir.path().join("state.json"));

        let mut tasks = Vec::new();
        for i in 0..16u8 {
            let target = target.clone();
            tasks.push(tokio::spawn(async move {
                write_file_atomic(&target, &vec![i; 4096]).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // One complete payload survives, never a mix of two
        let bytes = tokio::fs::read(target.as_path()).await.unwrap();
        assert_eq!(bytes.len(), 4096);
        assert!(bytes.iter().all(|b| *b == bytes[0]));
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_file_if_exists(&dir.path().join("nope")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_files_recurses_and_sums() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();
        tokio::fs::write(layout.originals_dir().join("a.jpg"), vec![0u8; 10]).await.unwrap();
        tokio::fs::create_dir_all(layout.originals_dir().join("nested")).await.unwrap();
        tokio::fs::write(layout.originals_dir().join("nested/b.jpg"), vec![0u8; 5]).await.unwrap();
        tokio::fs::write(layout.thumbnails_dir().join("a_thumb.jpg"), vec![0u8; 3]).await.unwrap();
        tokio::fs::write(layout.list_cache_dir().join("x.jpg"), vec![0u8; 100]).await.unwrap();

        assert_eq!(list_files(&layout.originals_dir()).await.len(), 2);
        assert_eq!(total_bytes(&layout.durable_dirs()).await, 18);
        assert_eq!(total_bytes(&layout.rendition_dirs()).await, 100);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(&dir.path().join("missing")).await.is_empty());
    }
}
