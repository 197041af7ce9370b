//! Undo of injected image batches
//!
//! Every block of one batch shares a `generated` timestamp, so "undo last"
//! removes all blocks carrying the newest timestamp. Blocks whose timestamp
//! does not parse sort below every valid one.

use limner_parser::{find_all_blocks, ContentBlock};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{codes, LimnerResult};
use crate::mutator::{remove, remove_matching, BlockSelection, Removal};
use crate::traits::{ArtifactStore, NoteStore};

/// Remove the most recent batch of blocks
pub fn undo_last(text: &str) -> Removal {
    let newest = find_all_blocks(text)
        .iter()
        .map(ContentBlock::timestamp)
        .max();
    match newest {
        None => remove_matching(text, |_| false),
        Some(newest) => remove_matching(text, |block| block.timestamp() == newest),
    }
}

/// Remove every block
pub fn clear_all(text: &str) -> Removal {
    remove(text, &BlockSelection::All)
}

/// Outcome of an undo or clear on a stored note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoReport {
    /// Blocks removed from the note
    pub removed_count: usize,
    /// Artifacts deleted from the vault
    pub deleted: Vec<String>,
    /// Artifacts that could not be deleted (logged, not fatal)
    pub failed_deletes: Vec<String>,
}

impl UndoReport {
    /// True when the note had no blocks to remove
    pub fn is_noop(&self) -> bool {
        self.removed_count == 0
    }
}

/// Applies undo and clear to stored notes and cleans up their images
pub struct UndoService {
    notes: Arc<dyn NoteStore>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl UndoService {
    /// Create a service over the given stores
    pub fn new(notes: Arc<dyn NoteStore>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { notes, artifacts }
    }

    /// Remove the newest batch from `note`
    pub async fn undo_last(&self, note: &str) -> LimnerResult<UndoReport> {
        self.apply(note, undo_last).await
    }

    /// Remove every block from `note`
    pub async fn clear_all(&self, note: &str) -> LimnerResult<UndoReport> {
        self.apply(note, clear_all).await
    }

    async fn apply(&self, note: &str, op: fn(&str) -> Removal) -> LimnerResult<UndoReport> {
        let text = self.notes.read(note).await?;
        let removal = op(&text);
        if removal.is_noop() {
            info!(note, "no image blocks found");
            return Ok(UndoReport::default());
        }

        self.notes.write(note, &removal.text).await?;
        info!(note, removed = removal.removed_count(), "removed image blocks");

        let mut report = UndoReport {
            removed_count: removal.removed_count(),
            ..UndoReport::default()
        };
        for path in removal.artifact_refs() {
            match self.artifacts.delete(&path).await {
                Ok(()) => report.deleted.push(path),
                Err(err) => {
                    warn!(
                        code = codes::ARTIFACT_DELETE_FAILED,
                        path = %path,
                        error = %err,
                        "failed to delete image file"
                    );
                    report.failed_deletes.push(path);
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutator::inject;
    use crate::types::{GeneratedArtifact, InsertionTarget};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn target(line: usize, id: &str) -> InsertionTarget {
        InsertionTarget::new(
            line,
            GeneratedArtifact {
                id: id.into(),
                storage_path: format!("att/{}.png", id),
                title: id.into(),
                description: id.into(),
                source_prompt: None,
            },
        )
    }

    fn two_batches() -> String {
        let text = "# A\na\n# B\nb";
        let first = inject(text, None, &[target(1, "img1"), target(3, "img2")], at(100)).unwrap();
        inject(&first, None, &[target(1, "img1")], at(200)).unwrap()
    }

    #[test]
    fn test_undo_last_removes_only_newest_batch() {
        let text = two_batches();
        let removal = undo_last(&text);
        assert_eq!(removal.removed_count(), 1);
        assert_eq!(removal.removed[0].generated_at, "1970-01-01T00:03:20.000Z");

        let left = find_all_blocks(&removal.text);
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|b| b.timestamp() == Some(at(100))));
    }

    #[test]
    fn test_clear_all_removes_both_batches() {
        let removal = clear_all(&two_batches());
        assert_eq!(removal.removed_count(), 3);
        assert_eq!(removal.text, "# A\na\n# B\nb");
    }

    #[test]
    fn test_undo_without_blocks_is_noop() {
        let removal = undo_last("# A\nbody");
        assert!(removal.is_noop());
        assert_eq!(removal.text, "# A\nbody");
    }

    #[test]
    fn test_unparseable_timestamp_sorts_lowest() {
        let text = "<!-- ai-summary:start id=\"old\" generated=\"yesterday\" -->\n![[a.png]]\n<!-- ai-summary:end id=\"old\" -->\n\
                    <!-- ai-summary:start id=\"new\" generated=\"2025-01-01T00:00:00.000Z\" -->\n![[b.png]]\n<!-- ai-summary:end id=\"new\" -->";
        let removal = undo_last(text);
        assert_eq!(removal.removed_count(), 1);
        assert_eq!(removal.removed[0].id, "new");

        let removal = undo_last(&removal.text);
        assert_eq!(removal.removed[0].id, "old");
        assert!(find_all_blocks(&removal.text).is_empty());
    }
}
