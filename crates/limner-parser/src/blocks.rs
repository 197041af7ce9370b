//! Image block codec
//!
//! Generated images are embedded in notes as self-delimiting blocks:
//!
//! ```text
//! <!-- ai-summary:start id="img1" generated="2025-01-01T00:00:00.000Z" prompt="a%20cat" -->
//! ![[attachments/ai-summary/20250101_cat.png]]
//! *A cat*
//! <!-- ai-summary:end id="img1" -->
//! ```
//!
//! The marker format is persisted in users' notes and must stay stable.
//!
//! Scanning is an explicit two-state machine over lines (outside a block,
//! inside a block) so malformed input such as an unterminated start marker is
//! handled in linear time with well-defined results.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlockError, BlockResult};

/// Prefix of every start marker line
pub const BLOCK_START_PREFIX: &str = "<!-- ai-summary:start ";

/// Prefix of every end marker line
pub const BLOCK_END_PREFIX: &str = "<!-- ai-summary:end ";

static START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<!-- ai-summary:start id="([^"]+)"((?:\s+\w+="[^"]*")*)\s*-->$"#)
        .expect("start marker pattern is valid")
});

static END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<!-- ai-summary:end id="([^"]+)"\s*-->$"#).expect("end marker pattern is valid")
});

static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("attribute pattern is valid"));

// ![[path]] / ![[path|alias]] or ![alt](path)
static EMBED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[\[([^\]|]+)(?:\|[^\]]*)?\]\]|!\[[^\]]*\]\(([^)\s]+)\)")
        .expect("embed pattern is valid")
});

/// Inclusive line range a block occupies in the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpan {
    /// Line of the start marker
    pub start: usize,
    /// Line of the end marker
    pub end: usize,
}

impl BlockSpan {
    /// Whether `line` falls inside the block (markers included)
    pub fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

/// A generated-image block embedded in a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Identifier shared by the start and end marker
    pub id: String,
    /// ISO-8601 generation timestamp exactly as written in the marker
    pub generated_at: String,
    /// Percent-encoded source prompt, kept verbatim for lossless re-encoding
    pub encoded_prompt: Option<String>,
    /// Payload lines between the markers
    pub body_lines: Vec<String>,
    /// Location in the scanned text; `None` for blocks not read from a note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<BlockSpan>,
}

impl ContentBlock {
    /// Build a block for a freshly generated artifact
    pub fn new(
        id: &str,
        generated_at: DateTime<Utc>,
        source_prompt: Option<&str>,
        artifact_path: &str,
        caption: &str,
    ) -> BlockResult<Self> {
        validate_block_id(id)?;
        if artifact_path.is_empty()
            || artifact_path.contains(['[', ']', '|', '\n', '\r'])
        {
            return Err(BlockError::invalid_artifact_path(artifact_path));
        }

        let caption = caption.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut body_lines = vec![format!("![[{}]]", artifact_path)];
        if !caption.is_empty() {
            body_lines.push(format!("*{}*", caption));
        }

        Ok(Self {
            id: id.to_string(),
            generated_at: format_timestamp(generated_at),
            encoded_prompt: source_prompt.map(encode_prompt),
            body_lines,
            span: None,
        })
    }

    /// Parsed generation time; `None` when the marker holds an unparseable value
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.generated_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Decoded source prompt
    pub fn source_prompt(&self) -> Option<String> {
        self.encoded_prompt.as_deref().map(decode_prompt)
    }

    /// First embedded image reference in the payload
    pub fn artifact_ref(&self) -> Option<String> {
        self.body_lines.iter().find_map(|line| {
            EMBED_RE.captures(line).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().trim().to_string())
            })
        })
    }

    /// Caption text (the first `*...*` payload line without the emphasis)
    pub fn caption(&self) -> Option<&str> {
        self.body_lines.iter().find_map(|line| {
            let line = line.trim();
            line.strip_prefix('*')
                .and_then(|rest| rest.strip_suffix('*'))
                .filter(|inner| !inner.is_empty())
        })
    }

    /// Start marker line
    pub fn start_marker(&self) -> String {
        match &self.encoded_prompt {
            Some(prompt) => format!(
                "{}id=\"{}\" generated=\"{}\" prompt=\"{}\" -->",
                BLOCK_START_PREFIX, self.id, self.generated_at, prompt
            ),
            None => format!(
                "{}id=\"{}\" generated=\"{}\" -->",
                BLOCK_START_PREFIX, self.id, self.generated_at
            ),
        }
    }

    /// End marker line
    pub fn end_marker(&self) -> String {
        format!("{}id=\"{}\" -->", BLOCK_END_PREFIX, self.id)
    }

    /// All lines of the block, markers included
    pub fn encoded_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.body_lines.len() + 2);
        lines.push(self.start_marker());
        lines.extend(self.body_lines.iter().cloned());
        lines.push(self.end_marker());
        lines
    }

    /// The block as text, without a trailing newline
    pub fn encode(&self) -> String {
        self.encoded_lines().join("\n")
    }
}

/// Render a timestamp the way block markers store it (`2025-01-01T00:00:00.000Z`)
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Percent-encode a prompt like `encodeURIComponent`
pub fn encode_prompt(prompt: &str) -> String {
    urlencoding::encode(prompt)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Decode a percent-encoded prompt, keeping the raw text if it is not valid UTF-8
pub fn decode_prompt(encoded: &str) -> String {
    urlencoding::decode(encoded)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| encoded.to_string())
}

/// Reject ids that are empty or would break a marker line
pub fn validate_block_id(id: &str) -> BlockResult<()> {
    if id.is_empty() || id.contains(['"', '\n', '\r']) || id.contains("-->") {
        return Err(BlockError::invalid_id(id));
    }
    Ok(())
}

struct OpenBlock {
    start: usize,
    id: String,
    generated_at: String,
    encoded_prompt: Option<String>,
    body_lines: Vec<String>,
}

enum ScanState {
    Outside,
    Inside(OpenBlock),
}

fn parse_start(line: &str, index: usize) -> Option<OpenBlock> {
    let caps = START_RE.captures(line.trim_end())?;
    let mut generated_at = String::new();
    let mut encoded_prompt = None;

    for attr in ATTR_RE.captures_iter(caps.get(2).map(|m| m.as_str()).unwrap_or("")) {
        match &attr[1] {
            "generated" => generated_at = attr[2].to_string(),
            "prompt" => encoded_prompt = Some(attr[2].to_string()),
            _ => {}
        }
    }

    Some(OpenBlock {
        start: index,
        id: caps[1].to_string(),
        generated_at,
        encoded_prompt,
        body_lines: Vec::new(),
    })
}

fn end_id(line: &str) -> Option<&str> {
    END_RE
        .captures(line.trim_end())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Find every well-formed block in `text`, in document order
///
/// Spans refer to lines of `text` as given (front matter included).
pub fn find_all_blocks(text: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut state = ScanState::Outside;

    for (index, line) in text.split('\n').enumerate() {
        state = match state {
            ScanState::Outside => match parse_start(line, index) {
                Some(open) => ScanState::Inside(open),
                None => ScanState::Outside,
            },
            ScanState::Inside(mut open) => {
                if end_id(line) == Some(open.id.as_str()) {
                    blocks.push(ContentBlock {
                        id: open.id,
                        generated_at: open.generated_at,
                        encoded_prompt: open.encoded_prompt,
                        body_lines: open.body_lines,
                        span: Some(BlockSpan {
                            start: open.start,
                            end: index,
                        }),
                    });
                    ScanState::Outside
                } else if let Some(next) = parse_start(line, index) {
                    debug!(id = %open.id, line = open.start, "skipping unterminated block");
                    ScanState::Inside(next)
                } else {
                    open.body_lines.push(line.to_string());
                    ScanState::Inside(open)
                }
            }
        };
    }

    if let ScanState::Inside(open) = state {
        debug!(id = %open.id, line = open.start, "skipping unterminated block at end of note");
    }

    blocks
}

/// The block whose span contains `line`
pub fn block_at_line(text: &str, line: usize) -> Option<ContentBlock> {
    find_all_blocks(text)
        .into_iter()
        .find(|block| block.span.is_some_and(|span| span.contains(line)))
}
