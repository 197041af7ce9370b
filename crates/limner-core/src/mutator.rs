//! Note mutation: block injection, removal and replacement
//!
//! All functions here are pure text transformations. Callers read the note,
//! pass the fingerprint they captured, and write the result back.
//!
//! Injected blocks are framed by one blank line above and one below. Removal
//! drops that frame again when both neighbours of a block are blank, so
//! removing everything that was injected restores the original text.

use chrono::{DateTime, Utc};
use limner_parser::{find_all_blocks, split_frontmatter, ContentBlock, Fingerprint};
use once_cell::sync::Lazy;
use regex::Regex;
use std::iter;
use tracing::debug;

use crate::error::{DocumentError, DocumentResult};
use crate::types::InsertionTarget;

static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n){3,}").expect("blank run pattern is valid"));

/// Fail with a conflict when `current_text` no longer matches `expected`
pub fn check_fingerprint(current_text: &str, expected: Option<&Fingerprint>) -> DocumentResult<()> {
    if let Some(expected) = expected {
        if !expected.matches(current_text) {
            return Err(DocumentError::conflict(
                expected.clone(),
                Fingerprint::of(current_text),
            ));
        }
    }
    Ok(())
}

/// Insert one block per target after its body line
///
/// Every block in the batch carries the same `generated_at` timestamp so the
/// batch can later be undone as a unit. Targets are applied bottom-up, which
/// keeps pending line numbers valid; targets sharing a line keep their input
/// order. Lines past the end of the body are clamped to the last line.
pub fn inject(
    current_text: &str,
    expected: Option<&Fingerprint>,
    targets: &[InsertionTarget],
    generated_at: DateTime<Utc>,
) -> DocumentResult<String> {
    check_fingerprint(current_text, expected)?;
    if targets.is_empty() {
        return Ok(current_text.to_string());
    }

    let mut pending = targets
        .iter()
        .enumerate()
        .map(|(order, target)| {
            let artifact = &target.artifact;
            let block = ContentBlock::new(
                &artifact.id,
                generated_at,
                artifact.source_prompt.as_deref(),
                &artifact.storage_path,
                &artifact.description,
            )?;
            Ok((target.line, order, block))
        })
        .collect::<DocumentResult<Vec<_>>>()?;
    pending.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

    let (_, body) = split_frontmatter(current_text);
    let header = &current_text[..current_text.len() - body.len()];
    let body = edit_lines(body, uses_crlf(current_text), |lines| {
        let last_line = lines.len() - 1;
        for (line, _, block) in pending {
            let at = line.min(last_line) + 1;
            debug!(id = %block.id, line, "inserting block");
            let framed = iter::once(String::new())
                .chain(block.encoded_lines())
                .chain(iter::once(String::new()));
            lines.splice(at..at, framed);
        }
    });

    Ok(format!("{}{}", header, body))
}

fn uses_crlf(text: &str) -> bool {
    text.contains("\r\n")
}

/// Apply `edit` to the LF-split lines of `text`, writing CRLF back when `crlf`
fn edit_lines<F>(text: &str, crlf: bool, edit: F) -> String
where
    F: FnOnce(&mut Vec<String>),
{
    let normalized = if crlf {
        text.replace("\r\n", "\n")
    } else {
        text.to_string()
    };
    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();
    edit(&mut lines);
    let joined = lines.join("\n");
    if crlf {
        joined.replace('\n', "\r\n")
    } else {
        joined
    }
}

/// Which blocks to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSelection {
    /// Every block
    All,
    /// Blocks with one of these ids
    Ids(Vec<String>),
}

impl BlockSelection {
    /// Whether `block` is selected
    pub fn matches(&self, block: &ContentBlock) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.iter().any(|id| *id == block.id),
        }
    }
}

/// Result of removing blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Note text after removal
    pub text: String,
    /// Removed blocks in document order
    pub removed: Vec<ContentBlock>,
}

impl Removal {
    /// Number of blocks removed
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// True when nothing was removed and the text is unchanged
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty()
    }

    /// Image references embedded in the removed blocks
    pub fn artifact_refs(&self) -> Vec<String> {
        self.removed
            .iter()
            .filter_map(ContentBlock::artifact_ref)
            .collect()
    }
}

/// Remove the selected blocks
pub fn remove(current_text: &str, selection: &BlockSelection) -> Removal {
    remove_matching(current_text, |block| selection.matches(block))
}

/// Remove every block for which `predicate` holds, then collapse runs of
/// three or more newlines to a single blank line
pub fn remove_matching<F>(current_text: &str, mut predicate: F) -> Removal
where
    F: FnMut(&ContentBlock) -> bool,
{
    let removed: Vec<ContentBlock> = find_all_blocks(current_text)
        .into_iter()
        .filter(|block| predicate(block))
        .collect();
    if removed.is_empty() {
        return Removal {
            text: current_text.to_string(),
            removed,
        };
    }

    let mut lines: Vec<&str> = current_text.split('\n').collect();
    for span in removed.iter().rev().filter_map(|block| block.span) {
        let (mut start, mut end) = (span.start, span.end);
        let framed = start > 0
            && end + 1 < lines.len()
            && lines[start - 1].trim().is_empty()
            && lines[end + 1].trim().is_empty();
        if framed {
            start -= 1;
            end += 1;
        }
        lines.drain(start..=end);
    }

    let paragraph_break = if uses_crlf(current_text) {
        "\r\n\r\n"
    } else {
        "\n\n"
    };
    let text = BLANK_RUN_RE
        .replace_all(&lines.join("\n"), paragraph_break)
        .into_owned();
    debug!(count = removed.len(), "removed blocks");
    Removal { text, removed }
}

/// Replace the block matching `target` (same id and timestamp) with
/// `replacement`, after a conflict check
pub fn replace_block(
    current_text: &str,
    expected: Option<&Fingerprint>,
    target: &ContentBlock,
    replacement: &ContentBlock,
) -> DocumentResult<String> {
    check_fingerprint(current_text, expected)?;

    let span = find_all_blocks(current_text)
        .into_iter()
        .find(|block| block.id == target.id && block.generated_at == target.generated_at)
        .and_then(|block| block.span)
        .ok_or_else(|| DocumentError::BlockNotFound(target.id.clone()))?;

    Ok(edit_lines(current_text, uses_crlf(current_text), |lines| {
        lines.splice(span.start..=span.end, replacement.encoded_lines());
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeneratedArtifact;
    use chrono::TimeZone;
    use limner_parser::{parse, resolve};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn artifact(id: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            id: id.to_string(),
            storage_path: format!("att/{}.png", id),
            title: id.to_uppercase(),
            description: format!("Caption {}", id),
            source_prompt: Some(format!("draw {}", id)),
        }
    }

    #[test]
    fn test_inject_after_section_body() {
        let text = "# A\nbody\n# B\nbody2";
        let doc = parse(text);
        let line = resolve(&doc, "A").line;
        assert_eq!(line, 1);

        let out = inject(
            text,
            Some(&Fingerprint::of(text)),
            &[InsertionTarget::new(line, artifact("img1"))],
            at(0),
        )
        .unwrap();

        let block_line = out
            .lines()
            .position(|l| l.contains("ai-summary:start id=\"img1\""))
            .unwrap();
        let b_line = out.lines().position(|l| l == "# B").unwrap();
        assert!(block_line < b_line);
        assert!(out.starts_with("# A\nbody\n\n<!-- ai-summary:start"));
        assert!(out.contains("![[att/img1.png]]\n*Caption img1*\n<!-- ai-summary:end id=\"img1\" -->\n\n# B"));
    }

    #[test]
    fn test_stale_fingerprint_conflicts() {
        let text = "# A\nbody";
        let stale = Fingerprint::of("# A\nold body");
        let err = inject(text, Some(&stale), &[InsertionTarget::new(1, artifact("x"))], at(0))
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_no_fingerprint_skips_check() {
        let out = inject("# A", None, &[InsertionTarget::new(0, artifact("x"))], at(0)).unwrap();
        assert_eq!(find_all_blocks(&out).len(), 1);
    }

    #[test]
    fn test_descending_insertion_keeps_targets_apart() {
        let text = "# A\na\n# B\nb\n# C\nc";
        let targets = [
            InsertionTarget::new(1, artifact("first")),
            InsertionTarget::new(5, artifact("third")),
            InsertionTarget::new(3, artifact("second")),
        ];
        let out = inject(text, None, &targets, at(0)).unwrap();
        let ids: Vec<_> = find_all_blocks(&out).into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["first", "second", "third"]);

        let heading_order: Vec<_> = out.lines().filter(|l| l.starts_with("# ")).collect();
        assert_eq!(heading_order, ["# A", "# B", "# C"]);
    }

    #[test]
    fn test_same_line_targets_keep_input_order() {
        let targets = [
            InsertionTarget::new(0, artifact("a")),
            InsertionTarget::new(0, artifact("b")),
        ];
        let out = inject("# Only", None, &targets, at(0)).unwrap();
        let ids: Vec<_> = find_all_blocks(&out).into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_inject_respects_front_matter() {
        let text = "---\ntitle: x\n---\n# A\nbody\n# B";
        let doc = parse(text);
        let line = resolve(&doc, "A").line;
        let out = inject(text, None, &[InsertionTarget::new(line, artifact("img"))], at(0)).unwrap();
        assert!(out.starts_with("---\ntitle: x\n---\n# A\nbody\n\n<!-- ai-summary:start"));
    }

    #[test]
    fn test_out_of_range_line_is_clamped() {
        let out = inject("# A\nx", None, &[InsertionTarget::new(99, artifact("z"))], at(0)).unwrap();
        assert!(out.starts_with("# A\nx\n\n<!--"));
    }

    #[test]
    fn test_invalid_artifact_aborts_whole_batch() {
        let mut bad = artifact("bad");
        bad.storage_path = "a]]b".into();
        let targets = [
            InsertionTarget::new(0, artifact("ok")),
            InsertionTarget::new(0, bad),
        ];
        assert!(matches!(
            inject("# A", None, &targets, at(0)),
            Err(DocumentError::Block(_))
        ));
    }

    #[test]
    fn test_inject_keeps_crlf_line_endings() {
        let text = "# A\r\nbody\r\n# B\r\nbody2";
        let out = inject(text, None, &[InsertionTarget::new(1, artifact("img"))], at(0)).unwrap();
        assert_eq!(out.matches('\n').count(), out.matches("\r\n").count());
        assert!(out.starts_with("# A\r\nbody\r\n\r\n<!-- ai-summary:start id=\"img\""));
        assert!(out.ends_with("<!-- ai-summary:end id=\"img\" -->\r\n\r\n# B\r\nbody2"));
        assert_eq!(find_all_blocks(&out).len(), 1);
    }

    #[test]
    fn test_remove_round_trip_with_crlf() {
        let text = "# A\r\nbody\r\n\r\n# B\r\nbody2\r\n";
        let targets = [
            InsertionTarget::new(1, artifact("one")),
            InsertionTarget::new(4, artifact("two")),
        ];
        let injected = inject(text, None, &targets, at(0)).unwrap();
        assert_eq!(remove(&injected, &BlockSelection::All).text, text);
    }

    #[test]
    fn test_replace_block_keeps_crlf_line_endings() {
        let text = "# A\r\nx\r\n";
        let injected = inject(text, None, &[InsertionTarget::new(1, artifact("img"))], at(0))
            .unwrap();
        let old = find_all_blocks(&injected).remove(0);
        let new = ContentBlock::new("img", at(60), None, "att/new.png", "New").unwrap();

        let out = replace_block(&injected, None, &old, &new).unwrap();
        assert_eq!(out.matches('\n').count(), out.matches("\r\n").count());
        assert!(out.contains("![[att/new.png]]\r\n*New*\r\n"));
        assert!(out.ends_with("\r\n"));
    }

    #[test]
    fn test_remove_round_trip() {
        let text = "# A\nbody\n\n# B\nbody2\n";
        let targets = [
            InsertionTarget::new(1, artifact("one")),
            InsertionTarget::new(4, artifact("two")),
            InsertionTarget::new(4, artifact("three")),
        ];
        let injected = inject(text, None, &targets, at(0)).unwrap();
        let removal = remove(&injected, &BlockSelection::All);
        assert_eq!(removal.removed_count(), 3);
        assert_eq!(removal.text, text);
        assert_eq!(
            removal.artifact_refs(),
            ["att/one.png", "att/two.png", "att/three.png"]
        );
    }

    #[test]
    fn test_remove_by_ids() {
        let targets = [
            InsertionTarget::new(0, artifact("keep")),
            InsertionTarget::new(0, artifact("drop")),
        ];
        let injected = inject("# A", None, &targets, at(0)).unwrap();
        let removal = remove(&injected, &BlockSelection::Ids(vec!["drop".into()]));
        let left: Vec<_> = find_all_blocks(&removal.text).into_iter().map(|b| b.id).collect();
        assert_eq!(left, ["keep"]);
    }

    #[test]
    fn test_remove_collapses_blank_runs() {
        let text = "a\n<!-- ai-summary:start id=\"x\" generated=\"2025-01-01T00:00:00.000Z\" -->\n![[p.png]]\n<!-- ai-summary:end id=\"x\" -->\n\n\n\nb";
        let removal = remove(text, &BlockSelection::All);
        assert_eq!(removal.text, "a\n\nb");
    }

    #[test]
    fn test_remove_without_blocks_is_noop() {
        let removal = remove("# A\n\n\n\nbody", &BlockSelection::All);
        assert!(removal.is_noop());
        assert_eq!(removal.text, "# A\n\n\n\nbody");
    }

    #[test]
    fn test_replace_block() {
        let injected = inject("# A\nx", None, &[InsertionTarget::new(1, artifact("img"))], at(0))
            .unwrap();
        let old = find_all_blocks(&injected).remove(0);
        let new = ContentBlock::new("img", at(60), Some("draw img"), "att/new.png", "Caption img")
            .unwrap();

        let out = replace_block(&injected, Some(&Fingerprint::of(&injected)), &old, &new).unwrap();
        let blocks = find_all_blocks(&out);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].artifact_ref().as_deref(), Some("att/new.png"));
        assert_eq!(blocks[0].generated_at, "1970-01-01T00:01:00.000Z");
        assert_eq!(out.lines().count(), injected.lines().count());
    }

    #[test]
    fn test_replace_missing_block() {
        let block = ContentBlock::new("gone", at(0), None, "p.png", "").unwrap();
        assert!(matches!(
            replace_block("# A", None, &block, &block),
            Err(DocumentError::BlockNotFound(_))
        ));
    }
}
