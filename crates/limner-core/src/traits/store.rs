//! Storage abstractions for notes, generated images and backups

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// Reads and writes note text
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Full text of a note
    async fn read(&self, note: &str) -> StorageResult<String>;

    /// Replace a note's text
    async fn write(&self, note: &str, text: &str) -> StorageResult<()>;
}

/// Stores generated images under vault-relative paths
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `bytes` to `path`, replacing any existing file
    async fn save(&self, path: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Delete the file at `path`
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Whether a file exists at `path`
    async fn exists(&self, path: &str) -> bool;
}

/// Snapshot of a note taken before images were injected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBackup {
    /// Note identifier (vault-relative path)
    pub note_id: String,
    /// Note text before injection
    pub content: String,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Images injected after the snapshot
    #[serde(default)]
    pub injected_images: Vec<String>,
}

impl NoteBackup {
    /// Snapshot taken now
    pub fn new(note_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            content: content.into(),
            created_at: Utc::now(),
            injected_images: Vec::new(),
        }
    }
}

/// Keeps the most recent pre-injection snapshot per note
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Store a snapshot, replacing any older one for the same note
    async fn save(&self, backup: NoteBackup) -> StorageResult<()>;

    /// Record an image injected after the latest snapshot
    async fn record_image(&self, note_id: &str, image_path: &str) -> StorageResult<()>;

    /// Latest snapshot for a note
    async fn latest(&self, note_id: &str) -> StorageResult<Option<NoteBackup>>;

    /// All snapshots, newest first
    async fn list(&self) -> StorageResult<Vec<NoteBackup>>;

    /// Forget a note's snapshot
    async fn remove(&self, note_id: &str) -> StorageResult<()>;
}
