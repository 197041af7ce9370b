//! Front-matter detection
//!
//! A note may open with a metadata block fenced by `---` lines. Line numbers
//! used by sections, resolution and injection are relative to the body that
//! follows it.

/// Split `content` into `(frontmatter, body)`
///
/// The returned front matter is the raw text between the fences (without
/// them). The body starts on the line after the closing fence. Both LF and CRLF
/// line endings are accepted. When the opening fence has no closing fence the
/// whole content is treated as body.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let rest = if let Some(rest) = content.strip_prefix("---\n") {
        rest
    } else if let Some(rest) = content.strip_prefix("---\r\n") {
        rest
    } else {
        return (None, content);
    };
    let open_len = content.len() - rest.len();

    let mut offset = 0;
    while offset <= rest.len() {
        let line_end = rest[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or(rest.len());
        let line = rest[offset..line_end].trim_end_matches('\r');

        if line == "---" {
            let yaml = rest[..offset]
                .strip_suffix('\n')
                .map(|s| s.strip_suffix('\r').unwrap_or(s))
                .unwrap_or(&rest[..offset]);
            let body_start = (line_end + 1).min(rest.len());
            return (Some(yaml), &content[open_len + body_start..]);
        }

        if line_end == rest.len() {
            break;
        }
        offset = line_end + 1;
    }

    (None, content)
}

/// Number of lines the front matter (fences included) occupies in `content`
pub fn frontmatter_line_count(content: &str) -> usize {
    let (frontmatter, body) = split_frontmatter(content);
    if frontmatter.is_none() {
        return 0;
    }
    let header = &content[..content.len() - body.len()];
    let newlines = header.matches('\n').count();
    if header.ends_with('\n') {
        newlines
    } else {
        // Closing fence is the last line and has no trailing newline
        newlines + 1
    }
}
