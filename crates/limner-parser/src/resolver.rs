//! Insertion-point resolution
//!
//! Planners name the heading an image belongs under, but rarely reproduce it
//! verbatim: markers get dropped, numbering changes, case differs. Resolution
//! normalizes both sides and maps the target to the body line after which the
//! image block is inserted.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::sections::ParsedDocument;

static HEADING_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#+\s*").expect("marker pattern is valid"));

// "2. ", "3) ", "4、", "5-", "6）", "7．"
static NUMBER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+[.\-)、）．]\s*").expect("number prefix pattern is valid")
});

/// Where a target heading landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Body line after which content is inserted
    pub line: usize,
    /// Index of the matched section, `None` when the fallback was used
    pub section: Option<usize>,
}

impl Resolution {
    /// True when no section matched and the end of the last section was used
    pub fn is_fallback(&self) -> bool {
        self.section.is_none()
    }
}

/// Normalize a heading for comparison
///
/// Strips leading `#` markers and list or number prefixes, trims, lowercases.
pub fn normalize_heading(raw: &str) -> String {
    let without_marker = HEADING_MARKER_RE.replace(raw, "");
    let without_number = NUMBER_PREFIX_RE.replace(&without_marker, "");
    without_number.trim().to_lowercase()
}

/// Resolve `target` to an insertion line in `doc`
///
/// Exact normalized matches win over prefix matches; when nothing matches the
/// end of the last section is used.
pub fn resolve(doc: &ParsedDocument, target: &str) -> Resolution {
    let normalized_target = normalize_heading(target);

    match find_section(doc, &normalized_target) {
        Some(index) => {
            let line = section_insert_line(doc, index);
            debug!(heading = target, section = index, line, "resolved insertion target");
            Resolution {
                line,
                section: Some(index),
            }
        }
        None => {
            let line = doc.sections.last().map(|s| s.line_end).unwrap_or(0);
            warn!(
                heading = target,
                line,
                "heading not found, falling back to end of last section"
            );
            Resolution {
                line,
                section: None,
            }
        }
    }
}

fn find_section(doc: &ParsedDocument, normalized_target: &str) -> Option<usize> {
    if normalized_target.is_empty() {
        return None;
    }

    let candidates: Vec<(usize, String)> = doc
        .sections
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_preamble())
        .map(|(i, s)| (i, normalize_heading(&s.heading)))
        .collect();

    candidates
        .iter()
        .find(|(_, heading)| heading == normalized_target)
        .or_else(|| {
            candidates
                .iter()
                .find(|(_, heading)| heading.starts_with(normalized_target))
        })
        .map(|(i, _)| *i)
}

/// Last line of the section proper, stopping short of a trailing `---` rule
fn section_insert_line(doc: &ParsedDocument, index: usize) -> usize {
    let section = &doc.sections[index];
    let lines = doc.body_lines();

    let scan_start = section.body_start();
    let scan_end = doc
        .sections
        .get(index + 1)
        .map(|next| next.line_start)
        .unwrap_or(lines.len());

    match (scan_start..scan_end.min(lines.len())).find(|&i| lines[i].trim() == "---") {
        Some(rule) => rule.saturating_sub(1).max(section.line_start),
        None => section.line_end,
    }
}
