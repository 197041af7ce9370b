//! File names for generated images

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest stem kept by [`sanitize_filename`], in characters
pub const MAX_STEM_CHARS: usize = 100;

static FORBIDDEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("forbidden pattern is valid"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static DASH_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("dash pattern is valid"));

/// Turn free text into a file-system safe stem
///
/// Forbidden characters and whitespace become `-`, dash runs collapse, edge
/// dashes are trimmed and the result is cut to [`MAX_STEM_CHARS`] characters.
/// Returns `unnamed` if nothing is left.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = FORBIDDEN_RE.replace_all(name, "-");
    let replaced = WHITESPACE_RE.replace_all(&replaced, "-");
    let collapsed = DASH_RUN_RE.replace_all(&replaced, "-");
    let trimmed: String = collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();

    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed
    }
}

/// `YYYYMMDD_{stem}.{extension}` with a sanitized stem
pub fn artifact_filename(date: DateTime<Utc>, stem: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        date.format("%Y%m%d"),
        sanitize_filename(stem),
        extension
    )
}

/// Join a vault folder and a file name with `/`
pub fn artifact_path(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", folder, filename)
    }
}
