//! Filesystem-backed note and artifact stores
//!
//! Both stores resolve paths against a vault root. Artifact paths come from
//! note text during undo, so they must be relative and stay inside the vault.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::traits::{ArtifactStore, NoteStore};

/// Resolve a vault-relative path, rejecting absolute paths and `..`
pub fn resolve_in_vault(root: &Path, relative: &str) -> StorageResult<PathBuf> {
    let relative_path = Path::new(relative);
    let safe = !relative.trim().is_empty()
        && relative_path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(StorageError::InvalidPath(relative.to_string()));
    }
    Ok(root.join(relative_path))
}

/// Notes stored as files under a vault root
#[derive(Debug, Clone)]
pub struct FsNoteStore {
    root: PathBuf,
}

impl FsNoteStore {
    /// Store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute notes are used as-is; relative ones are joined to the root
    pub fn note_path(&self, note: &str) -> PathBuf {
        let path = Path::new(note);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl NoteStore for FsNoteStore {
    async fn read(&self, note: &str) -> StorageResult<String> {
        let path = self.note_path(note);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::io("Failed to read", path, e))
    }

    async fn write(&self, note: &str, text: &str) -> StorageResult<()> {
        let path = self.note_path(note);
        debug!(path = %path.display(), bytes = text.len(), "writing note");
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| StorageError::io("Failed to write", path, e))
    }
}

/// Generated images stored under a vault root
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        let full = resolve_in_vault(&self.root, path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io("Failed to create folder", parent, e))?;
        }
        debug!(path = %full.display(), bytes = bytes.len(), "saving artifact");
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| StorageError::io("Failed to write", full, e))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full = resolve_in_vault(&self.root, path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| StorageError::io("Failed to delete", full, e))
    }

    async fn exists(&self, path: &str) -> bool {
        match resolve_in_vault(&self.root, path) {
            Ok(full) => tokio::fs::try_exists(full).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
