//! Vault, configuration and store wiring shared by the commands

use anyhow::{Context, Result};
use limner_config::{ConfigLoader, LimnerConfig};
use limner_core::{FsArtifactStore, FsNoteStore, JsonBackupStore, UndoService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs to touch the vault
pub struct CliContext {
    /// Vault root
    pub vault: PathBuf,
    /// Effective configuration (file, defaults and environment)
    pub config: LimnerConfig,
}

impl CliContext {
    /// Load configuration for a vault
    pub async fn load(vault: PathBuf, config_path: Option<&Path>) -> Result<Self> {
        let config = ConfigLoader::load(config_path)
            .await
            .context("Failed to load configuration")?;
        debug!(vault = %vault.display(), "using vault");
        Ok(Self { vault, config })
    }

    /// Fail when the configuration cannot reach the services
    pub fn require_services(&self) -> Result<()> {
        self.config
            .validate()
            .context("Configuration is not usable for generation")
    }

    /// Key a note is stored and backed up under
    ///
    /// Absolute paths inside the vault become vault-relative; everything else is
    /// kept as given.
    pub fn note_key(&self, note: &Path) -> String {
        if note.is_absolute() {
            if let Ok(relative) = note.strip_prefix(&self.vault) {
                return relative.to_string_lossy().into_owned();
            }
        }
        note.to_string_lossy().into_owned()
    }

    /// Note store over the vault
    pub fn notes(&self) -> Arc<FsNoteStore> {
        Arc::new(FsNoteStore::new(&self.vault))
    }

    /// Image store over the vault
    pub fn artifacts(&self) -> Arc<FsArtifactStore> {
        Arc::new(FsArtifactStore::new(&self.vault))
    }

    /// Backup file inside the vault
    pub fn backups(&self) -> Arc<JsonBackupStore> {
        Arc::new(JsonBackupStore::in_vault(
            &self.vault,
            self.config.storage.max_backups,
        ))
    }

    /// Undo over the vault stores
    pub fn undo_service(&self) -> UndoService {
        UndoService::new(self.notes(), self.artifacts())
    }
}
