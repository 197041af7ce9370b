//! JSON file backup store
//!
//! Keeps the latest pre-injection snapshot per note in a single JSON file
//! (`{vault}/.limner/backups.json` by default), newest first, capped at
//! `max_backups` entries across all notes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::traits::{BackupStore, NoteBackup};

/// Vault-relative location of the backup file
pub const DEFAULT_BACKUP_FILE: &str = ".limner/backups.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct BackupFile {
    backups: Vec<NoteBackup>,
}

/// [`BackupStore`] persisted as JSON
#[derive(Debug)]
pub struct JsonBackupStore {
    path: PathBuf,
    max_backups: usize,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonBackupStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            path: path.into(),
            max_backups,
            lock: Mutex::new(()),
        }
    }

    /// Store at the default location inside `vault_root`
    pub fn in_vault(vault_root: &Path, max_backups: usize) -> Self {
        Self::new(vault_root.join(DEFAULT_BACKUP_FILE), max_backups)
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<BackupFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StorageError::serialization(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BackupFile::default()),
            Err(e) => Err(StorageError::io("Failed to read", &self.path, e)),
        }
    }

    async fn store(&self, file: &BackupFile) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io("Failed to create folder", parent, e))?;
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StorageError::io("Failed to write", &self.path, e))
    }
}

#[async_trait]
impl BackupStore for JsonBackupStore {
    async fn save(&self, backup: NoteBackup) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        file.backups.retain(|b| b.note_id != backup.note_id);
        debug!(note = %backup.note_id, "saving backup");
        file.backups.insert(0, backup);
        file.backups.truncate(self.max_backups);
        self.store(&file).await
    }

    async fn record_image(&self, note_id: &str, image_path: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        match file.backups.iter_mut().find(|b| b.note_id == note_id) {
            Some(backup) => {
                backup.injected_images.push(image_path.to_string());
                self.store(&file).await
            }
            None => Ok(()),
        }
    }

    async fn latest(&self, note_id: &str) -> StorageResult<Option<NoteBackup>> {
        let file = self.load().await?;
        Ok(file.backups.into_iter().find(|b| b.note_id == note_id))
    }

    async fn list(&self) -> StorageResult<Vec<NoteBackup>> {
        Ok(self.load().await?.backups)
    }

    async fn remove(&self, note_id: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let before = file.backups.len();
        file.backups.retain(|b| b.note_id != note_id);
        if file.backups.len() == before {
            return Ok(());
        }
        self.store(&file).await
    }
}
