//! Heading-delimited sections
//!
//! The parser is deliberately line-oriented rather than CommonMark-aware:
//! insertion targets are line numbers, so every section records the exact line
//! range it covers in the front-matter-stripped body.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frontmatter::split_frontmatter;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+.+$").expect("heading pattern is valid"));

/// A heading and the body lines that follow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Raw heading line including the `#` markers; empty for the preamble
    pub heading: String,
    /// Heading level 1-6, or 0 for content before the first heading
    pub level: u8,
    /// Body lines joined with `\n` (heading line excluded)
    pub body: String,
    /// First line of the section (the heading line, or 0 for the preamble)
    pub line_start: usize,
    /// Last line of the section, inclusive
    pub line_end: usize,
}

impl Section {
    /// Whether this is the content before the first heading
    pub fn is_preamble(&self) -> bool {
        self.level == 0
    }

    /// Heading text with the `#` markers and surrounding whitespace removed
    pub fn title(&self) -> &str {
        self.heading.trim_start_matches('#').trim()
    }

    /// Line of the first body line (the line after the heading)
    pub fn body_start(&self) -> usize {
        if self.is_preamble() {
            self.line_start
        } else {
            self.line_start + 1
        }
    }
}

/// A note split into sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Raw front matter between the fences, if any
    pub frontmatter: Option<String>,
    /// Note text after the front matter; all line numbers refer to this
    pub body: String,
    /// Sections in document order
    pub sections: Vec<Section>,
    /// The full text that was parsed
    pub raw_text: String,
}

impl ParsedDocument {
    /// True when no sections were found
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Body lines, split exactly like the parser splits them
    pub fn body_lines(&self) -> Vec<&str> {
        self.body.split('\n').collect()
    }

    /// Index of the last body line
    pub fn last_line(&self) -> usize {
        self.body.split('\n').count().saturating_sub(1)
    }

    /// Raw heading lines of every headed section
    pub fn headings(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| !s.heading.is_empty())
            .map(|s| s.heading.as_str())
            .collect()
    }

    /// Line number of the section whose raw heading equals `heading`
    pub fn find_heading_line(&self, heading: &str) -> Option<usize> {
        self.sections
            .iter()
            .find(|s| !s.heading.is_empty() && s.heading == heading)
            .map(|s| s.line_start)
    }
}

/// Parse a note into sections
pub fn parse(text: &str) -> ParsedDocument {
    let (frontmatter, body) = split_frontmatter(text);
    let sections = extract_sections(body);

    if sections.is_empty() {
        debug!("note has no sections");
    } else {
        debug!(count = sections.len(), "parsed note sections");
    }

    ParsedDocument {
        frontmatter: frontmatter.map(str::to_string),
        body: body.to_string(),
        sections,
        raw_text: text.to_string(),
    }
}

fn heading_level(line: &str) -> Option<u8> {
    HEADING_RE.captures(line).map(|caps| caps[1].len() as u8)
}

fn extract_sections(body: &str) -> Vec<Section> {
    if body.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = body.split('\n').collect();
    let last = lines.len() - 1;

    // (heading line index, level) for every heading in order
    let starts: Vec<(usize, u8)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| heading_level(line).map(|level| (i, level)))
        .collect();

    let mut sections = Vec::with_capacity(starts.len() + 1);

    let first_heading = starts.first().map(|(i, _)| *i).unwrap_or(lines.len());
    if first_heading > 0 {
        sections.push(Section {
            heading: String::new(),
            level: 0,
            body: lines[..first_heading].join("\n"),
            line_start: 0,
            line_end: first_heading - 1,
        });
    }

    for (idx, &(start, level)) in starts.iter().enumerate() {
        let end = starts
            .get(idx + 1)
            .map(|(next, _)| next - 1)
            .unwrap_or(last);
        sections.push(Section {
            heading: lines[start].to_string(),
            level,
            body: lines[start + 1..=end].join("\n"),
            line_start: start,
            line_end: end,
        });
    }

    sections
}
