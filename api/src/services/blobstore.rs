//! Component A — Blob Store. Plain filesystem-backed storage for uploaded
//! originals and processed outputs. Every path handed to us is relative and
//! validated to stay inside the configured root before any I/O happens.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("path escapes the storage root")]
    PathTraversal,
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single filesystem root. The service owns three of these (originals,
/// processed, temp) per the configured paths.
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `relative_path` against the root, rejecting any path that
    /// contains `..`, an absolute prefix, or otherwise escapes the root.
    /// Does not touch the filesystem, so it's safe to call before the
    /// target exists.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(relative_path);
        for component in candidate.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(StorageError::PathTraversal),
            }
        }
        Ok(self.root.join(candidate))
    }

    pub async fn store(&self, relative_path: &str, bytes: Bytes) -> Result<u64, StorageError> {
        let full = self.resolve(relative_path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        let len = bytes.len() as u64;
        let mut file = fs::File::create(&full).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(len)
    }

    pub async fn load(&self, relative_path: &str) -> Result<Bytes, StorageError> {
        let full = self.resolve(relative_path)?;
        match fs::read(&full).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copies a blob into a caller-owned path outside any of the three
    /// roots (the orchestrator uses this to stage a local working copy for
    /// ffmpeg). `dest` is used as-is, not resolved against `root`.
    pub async fn copy_to(&self, relative_path: &str, dest: &Path) -> Result<(), StorageError> {
        let full = self.resolve(relative_path)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&full, dest).await?;
        Ok(())
    }

    /// Moves a file from outside the store (e.g. ffmpeg's output) into
    /// `relative_path`.
    pub async fn adopt(&self, source: &Path, relative_path: &str) -> Result<u64, StorageError> {
        let full = self.resolve(relative_path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(source, &full).await?;
        let metadata = fs::metadata(&full).await?;
        let _ = fs::remove_file(source).await;
        Ok(metadata.len())
    }

    pub async fn delete(&self, relative_path: &str) -> Result<(), StorageError> {
        let full = self.resolve(relative_path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_loads_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        store.store("a/b.bin", Bytes::from_static(b"hello")).await.unwrap();
        let loaded = store.load("a/b.bin").await.unwrap();
        assert_eq!(&loaded[..], b"hello");
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let err = store.store("../escape.bin", Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, StorageError::PathTraversal));
    }

    #[tokio::test]
    async fn rejects_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let err = store.store("/etc/passwd", Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, StorageError::PathTraversal));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let err = store.load("nope.bin").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        store.delete("never-existed.bin").await.unwrap();
    }
}
