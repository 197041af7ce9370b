use anyhow::{Context, Result};
use limner_core::{clear_all, NoteStore, UndoReport};
use std::path::Path;

use crate::context::CliContext;

pub async fn execute(ctx: CliContext, note: &Path) -> Result<()> {
    let key = ctx.note_key(note);
    let report = ctx
        .undo_service()
        .undo_last(&key)
        .await
        .with_context(|| format!("Failed to undo images in {}", key))?;

    print_report(&key, &report);
    Ok(())
}

pub async fn execute_clear(ctx: CliContext, note: &Path, yes: bool) -> Result<()> {
    let key = ctx.note_key(note);

    if !yes {
        let text = ctx
            .notes()
            .read(&key)
            .await
            .with_context(|| format!("Failed to read {}", key))?;
        let count = clear_all(&text).removed_count();
        if count == 0 {
            println!("No generated images in {}", key);
        } else {
            println!(
                "This removes {} image block(s) and their files from {}. Re-run with --yes to confirm.",
                count, key
            );
        }
        return Ok(());
    }

    let report = ctx
        .undo_service()
        .clear_all(&key)
        .await
        .with_context(|| format!("Failed to clear images in {}", key))?;

    print_report(&key, &report);
    Ok(())
}

fn print_report(key: &str, report: &UndoReport) {
    if report.is_noop() {
        println!("No generated images in {}", key);
        return;
    }
    println!("Removed {} image block(s) from {}", report.removed_count, key);
    for path in &report.deleted {
        println!("  deleted {}", path);
    }
    for path in &report.failed_deletes {
        println!("  could not delete {}", path);
    }
}
