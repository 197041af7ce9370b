use anyhow::{bail, Result};
use limner_core::{ImagePipeline, LimnerError};
use limner_llm::create_clients;
use std::path::Path;

use crate::context::CliContext;
use crate::progress::BarReporter;

/// Message shown when the note was edited while images were generating
pub const CONFLICT_MESSAGE: &str = "note changed since it was read; re-run to retry";

pub async fn execute(ctx: CliContext, note: &Path) -> Result<()> {
    ctx.require_services()?;
    let clients = create_clients(&ctx.config.connection)?;
    let key = ctx.note_key(note);

    let mut pipeline = ImagePipeline::new(
        clients.planner,
        clients.images,
        ctx.notes(),
        ctx.artifacts(),
        &ctx.config,
    );
    if ctx.config.storage.create_backup {
        pipeline = pipeline.with_backups(ctx.backups());
    }

    let reporter = BarReporter::new();
    let result = pipeline.run(&key, &reporter).await;
    reporter.finish();

    let report = match result {
        Ok(report) => report,
        Err(err) => return Err(describe(err)),
    };

    for failure in &report.failures {
        println!(
            "Skipped {} ({}): {}",
            failure.title, failure.code, failure.message
        );
    }
    if report.is_empty() {
        if report.planned == 0 {
            bail!("The planner returned no images for {}", key);
        }
        bail!("No images were generated for {}", key);
    }

    println!(
        "Added {} of {} image(s) to {}",
        report.generated.len(),
        report.planned,
        key
    );
    for artifact in &report.generated {
        println!("  {} -> {}", artifact.title, artifact.storage_path);
    }
    if !report.fallbacks.is_empty() {
        println!(
            "Heading not found, placed at the end of the note: {}",
            report.fallbacks.join(", ")
        );
    }
    Ok(())
}

/// Turn pipeline errors into CLI errors
pub(crate) fn describe(err: LimnerError) -> anyhow::Error {
    if err.is_conflict() {
        anyhow::anyhow!(CONFLICT_MESSAGE)
    } else {
        anyhow::Error::new(err)
    }
}
