use anyhow::{Context, Result};
use limner_core::BackupStore;
use std::path::Path;

use crate::context::CliContext;

pub async fn execute(ctx: CliContext, note: &Path, show_content: bool) -> Result<()> {
    let key = ctx.note_key(note);
    let store = ctx.backups();
    let backup = store
        .latest(&key)
        .await
        .with_context(|| format!("Failed to read backups from {}", store.path().display()))?;

    let Some(backup) = backup else {
        println!("No backup for {}", key);
        return Ok(());
    };

    println!(
        "Backup of {} taken {}",
        backup.note_id,
        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {} line(s), {} image(s) injected since",
        backup.content.lines().count(),
        backup.injected_images.len()
    );
    for image in &backup.injected_images {
        println!("  {}", image);
    }
    if show_content {
        println!();
        println!("{}", backup.content);
    }
    Ok(())
}
