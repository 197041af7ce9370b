//! Planning excerpts
//!
//! The planner only needs the gist of a note. Excerpts drop front matter,
//! collapse fenced code and, when still over budget, give every section an
//! equal share of the character budget. Budgets count characters, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::sections::ParsedDocument;

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w+)?\n.*?```").expect("code fence pattern is valid"));

const TRUNCATION_MARKER: &str = "\n\n[truncated]";

/// Build a planning excerpt of at most `max_chars` characters (plus marker)
pub fn excerpt(doc: &ParsedDocument, max_chars: usize) -> String {
    let mut content = CODE_FENCE_RE
        .replace_all(&doc.body, |caps: &regex::Captures<'_>| {
            format!(
                "[code block: {}]",
                caps.get(1).map(|m| m.as_str()).unwrap_or("code")
            )
        })
        .into_owned();

    if char_len(&content) > max_chars && !doc.sections.is_empty() {
        let per_section = max_chars / doc.sections.len();
        content = doc
            .sections
            .iter()
            .map(|section| {
                let body = take_chars(&section.body, per_section);
                let ellipsis = if char_len(&section.body) > per_section {
                    "..."
                } else {
                    ""
                };
                format!("{}\n{}{}", section.heading, body, ellipsis)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
    }

    if char_len(&content) > max_chars {
        content = format!("{}{}", take_chars(&content, max_chars), TRUNCATION_MARKER);
    }

    content
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
