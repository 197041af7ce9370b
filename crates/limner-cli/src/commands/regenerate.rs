use anyhow::{bail, Result};
use limner_core::ImagePipeline;
use limner_llm::create_clients;
use std::path::Path;

use crate::commands::generate::describe;
use crate::context::CliContext;
use crate::progress::BarReporter;

/// `line` is 1-based, as editors show it
pub async fn execute(ctx: CliContext, note: &Path, line: usize) -> Result<()> {
    if line == 0 {
        bail!("--line is 1-based; the first line is 1");
    }
    ctx.require_services()?;
    let clients = create_clients(&ctx.config.connection)?;
    let key = ctx.note_key(note);

    let pipeline = ImagePipeline::new(
        clients.planner,
        clients.images,
        ctx.notes(),
        ctx.artifacts(),
        &ctx.config,
    );

    let reporter = BarReporter::new();
    let result = pipeline.regenerate(&key, line - 1, &reporter).await;
    reporter.finish();

    let report = result.map_err(describe)?;
    println!("Regenerated {} -> {}", report.id, report.artifact_path);
    if let Some(previous) = report.previous_path {
        println!("  replaced {}", previous);
    }
    Ok(())
}
