use anyhow::{bail, Context, Result};
use limner_core::parser::{find_all_blocks, frontmatter_line_count, parse};
use limner_core::NoteStore;
use std::path::Path;

use crate::context::CliContext;

/// Print sections and image blocks with 1-based line numbers of the whole file
///
/// With `heading`, print only the line of that exact heading.
pub async fn execute(ctx: CliContext, note: &Path, heading: Option<&str>) -> Result<()> {
    let key = ctx.note_key(note);
    let text = ctx
        .notes()
        .read(&key)
        .await
        .with_context(|| format!("Failed to read {}", key))?;

    let doc = parse(&text);
    let offset = frontmatter_line_count(&text);

    if let Some(heading) = heading {
        let Some(line) = doc.find_heading_line(heading) else {
            let known = doc.headings();
            if known.is_empty() {
                bail!("{} has no headings", key);
            }
            bail!("No heading {:?} in {}; headings are: {}", heading, key, known.join(", "));
        };
        println!("{}", line + offset + 1);
        return Ok(());
    }

    let blocks = find_all_blocks(&text);

    println!(
        "{}: {} section(s), {} image block(s)",
        key,
        doc.sections.len(),
        blocks.len()
    );
    for section in &doc.sections {
        let heading = if section.is_preamble() {
            "(preamble)"
        } else {
            section.heading.as_str()
        };
        println!(
            "  {:>5}-{:<5} {}",
            section.line_start + offset + 1,
            section.line_end + offset + 1,
            heading
        );
    }

    if blocks.is_empty() {
        return Ok(());
    }
    println!("Image blocks:");
    for block in &blocks {
        let lines = block
            .span
            .map(|span| format!("{}-{}", span.start + 1, span.end + 1))
            .unwrap_or_default();
        println!(
            "  {:>11} {} {} {}",
            lines,
            block.id,
            block.generated_at,
            block.artifact_ref().unwrap_or_else(|| "(no image)".to_string())
        );
        if let Some(caption) = block.caption() {
            println!("              {}", caption);
        }
    }
    Ok(())
}
