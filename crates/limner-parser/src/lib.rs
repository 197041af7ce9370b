//! Limner Note Parser
//!
//! Line-oriented document structure for notes that receive generated images.
//! This crate provides:
//! - Front-matter stripping and heading-delimited sections
//! - Insertion-point resolution for inexact heading targets
//! - The `ai-summary` image block codec and a linear block scanner
//! - Content fingerprints used for conflict detection
//! - Planning excerpts that fit a character budget
//!
//! Everything here is pure: no I/O, no clocks other than what callers pass in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blocks;
pub mod error;
pub mod excerpt;
pub mod fingerprint;
pub mod frontmatter;
pub mod resolver;
pub mod sections;

// Re-export main types for convenience
pub use blocks::{
    block_at_line, decode_prompt, encode_prompt, find_all_blocks, format_timestamp,
    validate_block_id, BlockSpan, ContentBlock, BLOCK_END_PREFIX, BLOCK_START_PREFIX,
};
pub use error::{BlockError, BlockResult};
pub use excerpt::excerpt;
pub use fingerprint::{fingerprint, Fingerprint};
pub use frontmatter::{frontmatter_line_count, split_frontmatter};
pub use resolver::{normalize_heading, resolve, Resolution};
pub use sections::{parse, ParsedDocument, Section};
