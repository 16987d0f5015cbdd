//! Tolerant unified-diff parser.
//!
//! Accepts the common real-world dialect: VCS preamble noise (`diff --git`,
//! `index`, rename/mode lines, binary-patch markers), the standard unified
//! header pair (`--- old` / `+++ new`) and the context-like variant that
//! pairs a `*** old` header with a unified `--- new` header, short or bare
//! `@@` hunk headers, and the usual `' '`/`+`/`-` body prefixes plus a
//! couple of real-world forgiveness rules (naked blank context lines,
//! `\ No newline at end of file`).

use thiserror::Error;

use crate::model::{normalize_path, FilePatch, Hunk, HunkLine};

/// Fatal conditions that abort parsing. No partial list is ever returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing new-file header after: {0}")]
    MissingNewHeader(String),
    #[error("bad hunk header: {0}")]
    BadHunkHeader(String),
    #[error("hunk header found before any file header")]
    HunkBeforeFileHeader,
    #[error("unrecognized line in hunk body: {0}")]
    UnrecognizedBodyLine(String),
    #[error("no file patches found")]
    NoFilePatches,
}

const PREAMBLE_PREFIXES: &[&str] = &[
    "diff ",
    "index ",
    "new file mode",
    "deleted file mode",
    "similarity index",
    "rename from",
    "rename to",
    "GIT binary patch",
    "Binary files ",
];

const NEW_HEADER_LOOKAHEAD: usize = 3;

fn is_preamble_noise(line: &str) -> bool {
    PREAMBLE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Matches a header line of the form `<prefix><path>`, rejecting it (to avoid
/// misreading a legacy context-diff range marker like `*** 1,5 ***`) when the
/// path portion starts with a digit.
fn match_header<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(prefix)?;
    if starts_with_digit(rest) {
        None
    } else {
        Some(rest)
    }
}

fn match_unified_old(line: &str) -> Option<&str> {
    match_header(line, "--- ")
}

fn match_unified_new(line: &str) -> Option<&str> {
    match_header(line, "+++ ")
}

fn match_context_old(line: &str) -> Option<&str> {
    match_header(line, "*** ")
}

// The context-like form's new header is spelled identically to the unified
// form's old header: `--- path`.
fn match_context_new(line: &str) -> Option<&str> {
    match_unified_old(line)
}

/// Look ahead up to [`NEW_HEADER_LOOKAHEAD`] lines from `start`, skipping
/// preamble noise, for a line matching `is_new`. Returns the absolute index
/// of the matching line and its normalised path.
fn find_new_header(
    lines: &[&str],
    start: usize,
    is_new: impl Fn(&str) -> Option<&str>,
) -> Option<(usize, String)> {
    let limit = (start + NEW_HEADER_LOOKAHEAD).min(lines.len());
    for (j, &line) in lines.iter().enumerate().take(limit).skip(start) {
        if is_preamble_noise(line) {
            continue;
        }
        if let Some(path) = is_new(line) {
            return Some((j, normalize_path(path)));
        }
        // Do not skip arbitrary lines unless they are known noise: a
        // non-noise line that isn't the expected header aborts the lookahead.
        return None;
    }
    None
}

/// Split input into lines on `\n`, keeping any preceding `\r` attached (so
/// CRLF survives round-trip if the caller preserves it). A trailing newline
/// does not introduce a spurious empty final line.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize), ParseError> {
    let rest = &line[2..]; // strip leading "@@"
    if rest.trim().is_empty() {
        return Ok((1, 0, 1, 0));
    }
    let Some(close_idx) = rest.find("@@") else {
        return Err(ParseError::BadHunkHeader(line.to_string()));
    };
    parse_hunk_ranges(rest[..close_idx].trim(), line)
}

fn parse_hunk_ranges(
    ranges_part: &str,
    original_line: &str,
) -> Result<(usize, usize, usize, usize), ParseError> {
    if ranges_part.is_empty() {
        return Ok((1, 0, 1, 0));
    }
    let bad = || ParseError::BadHunkHeader(original_line.to_string());

    let mut tokens = ranges_part.split_whitespace();
    let old_tok = tokens.next().ok_or_else(bad)?;
    let new_tok = tokens.next().ok_or_else(bad)?;
    if tokens.next().is_some() {
        return Err(bad());
    }
    let old_rest = old_tok.strip_prefix('-').ok_or_else(bad)?;
    let new_rest = new_tok.strip_prefix('+').ok_or_else(bad)?;
    let (old_start, old_len) = parse_start_len(old_rest, original_line)?;
    let (new_start, new_len) = parse_start_len(new_rest, original_line)?;
    Ok((old_start, old_len, new_start, new_len))
}

fn parse_start_len(s: &str, original_line: &str) -> Result<(usize, usize), ParseError> {
    let bad = || ParseError::BadHunkHeader(original_line.to_string());
    if s.is_empty() {
        return Ok((1, 0));
    }
    match s.split_once(',') {
        Some((start, len)) => {
            let start = start.parse::<usize>().map_err(|_| bad())?;
            let len = len.parse::<usize>().map_err(|_| bad())?;
            Ok((start, len))
        }
        None => {
            let start = s.parse::<usize>().map_err(|_| bad())?;
            Ok((start, 0))
        }
    }
}

fn is_body_terminator(line: &str) -> bool {
    line.starts_with("@@")
        || match_unified_old(line).is_some()
        || match_context_old(line).is_some()
        || line.starts_with("diff ")
}

/// Parse unified diff text into an ordered list of file-patches.
///
/// Tolerant of VCS preamble noise and short/bare hunk headers; see the
/// module documentation for the accepted dialect.
pub fn parse_unified_diff(text: &str) -> Result<Vec<FilePatch>, ParseError> {
    let lines = split_lines(text);
    let mut patches: Vec<FilePatch> = Vec::new();
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];

        if is_preamble_noise(line) {
            log::trace!("parser: skipping preamble line {line:?}");
            i += 1;
            continue;
        }

        if let Some(old_path_raw) = match_context_old(line) {
            let Some((new_idx, new_path)) = find_new_header(&lines, i + 1, match_context_new)
            else {
                return Err(ParseError::MissingNewHeader(line.to_string()));
            };
            patches.push(FilePatch {
                old_path: Some(normalize_path(old_path_raw)),
                new_path: Some(new_path),
                hunks: Vec::new(),
            });
            i = new_idx + 1;
            continue;
        }

        if let Some(old_path_raw) = match_unified_old(line) {
            let Some((new_idx, new_path)) = find_new_header(&lines, i + 1, match_unified_new)
            else {
                return Err(ParseError::MissingNewHeader(line.to_string()));
            };
            patches.push(FilePatch {
                old_path: Some(normalize_path(old_path_raw)),
                new_path: Some(new_path),
                hunks: Vec::new(),
            });
            i = new_idx + 1;
            continue;
        }

        if line.starts_with("@@") {
            let (old_start, old_len, new_start, new_len) = parse_hunk_header(line)?;
            let current = patches.last_mut().ok_or(ParseError::HunkBeforeFileHeader)?;
            i += 1;

            let mut body: Vec<HunkLine> = Vec::new();
            while i < lines.len() && !is_body_terminator(lines[i]) {
                let body_line = lines[i];
                if body_line.is_empty() {
                    body.push(HunkLine::context(""));
                } else if let Some(rest) = body_line.strip_prefix(' ') {
                    body.push(HunkLine::context(rest));
                } else if let Some(rest) = body_line.strip_prefix('+') {
                    body.push(HunkLine::addition(rest));
                } else if let Some(rest) = body_line.strip_prefix('-') {
                    body.push(HunkLine::deletion(rest));
                } else if body_line.starts_with("\\ No newline at end of file") {
                    // end-of-file newline semantics are out of scope; ignore.
                } else {
                    return Err(ParseError::UnrecognizedBodyLine(body_line.to_string()));
                }
                i += 1;
            }

            current.hunks.push(Hunk { old_start, old_len, new_start, new_len, lines: body });
            continue;
        }

        // Unrecognized top-level line outside any hunk body (e.g. a digit-led
        // legacy range marker, or other diff metadata) — silently skipped.
        i += 1;
    }

    if patches.is_empty() {
        return Err(ParseError::NoFilePatches);
    }
    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_empty_document() {
        assert_eq!(parse_unified_diff(""), Err(ParseError::NoFilePatches));
    }

    #[test]
    fn parses_simple_unified_hunk() {
        let diff = "--- a/x\n+++ b/x\n@@ -1,1 +1,2 @@\n+z\n a\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches.len(), 1);
        let fp = &patches[0];
        assert_eq!(fp.old_path.as_deref(), Some("x"));
        assert_eq!(fp.new_path.as_deref(), Some("x"));
        assert_eq!(fp.hunks.len(), 1);
        assert_eq!(fp.hunks[0].lines[0].kind, LineKind::Addition);
        assert_eq!(fp.hunks[0].lines[0].text, "z");
        assert_eq!(fp.hunks[0].lines[1].kind, LineKind::Context);
    }

    #[test]
    fn parses_context_like_header_pair() {
        let diff = "*** a/x\n--- b/x\n@@ -1,1 +1,1 @@\n-a\n+b\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches[0].old_path.as_deref(), Some("x"));
        assert_eq!(patches[0].new_path.as_deref(), Some("x"));
    }

    #[test]
    fn rejects_digit_led_range_marker_as_header() {
        // "*** 1,5 ***" must not be mistaken for a context-old header.
        let diff = "*** 1,5 ***\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn skips_preamble_noise() {
        let diff = "diff --git a/x b/x\nindex 111..222 100644\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].old_path.as_deref(), Some("x"));
        assert_eq!(patches[0].hunks.len(), 1);
    }

    #[test]
    fn missing_new_header_is_fatal() {
        let diff = "--- a/x\n@@ -1 +1 @@\n-a\n+b\n";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(ParseError::MissingNewHeader(_))
        ));
    }

    #[test]
    fn missing_new_header_after_context_like_old_is_fatal() {
        let diff = "*** a/x\ngarbage\n--- b/x\n@@ -1 +1 @@\n-a\n+b\n";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(ParseError::MissingNewHeader(_))
        ));
    }

    #[test]
    fn non_noise_line_between_headers_aborts_lookahead() {
        let diff = "--- a/x\nhello\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(ParseError::MissingNewHeader(_))
        ));
    }

    #[test]
    fn hunk_before_file_header_is_fatal() {
        let diff = "@@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(parse_unified_diff(diff), Err(ParseError::HunkBeforeFileHeader));
    }

    #[test]
    fn bad_hunk_header_is_fatal() {
        let diff = "--- a/x\n+++ b/x\n@@ garbage @@\n-a\n+b\n";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(ParseError::BadHunkHeader(_))
        ));
    }

    #[test]
    fn bare_hunk_header_defaults() {
        let diff = "--- a/x\n+++ b/x\n@@\n+only\n";
        let patches = parse_unified_diff(diff).unwrap();
        let h = &patches[0].hunks[0];
        assert_eq!((h.old_start, h.old_len, h.new_start, h.new_len), (1, 0, 1, 0));
    }

    #[test]
    fn short_hunk_header_defaults_len_to_zero() {
        let diff = "--- a/x\n+++ b/x\n@@ -5 +5 @@\n-a\n+b\n";
        let patches = parse_unified_diff(diff).unwrap();
        let h = &patches[0].hunks[0];
        assert_eq!((h.old_start, h.old_len, h.new_start, h.new_len), (5, 0, 5, 0));
    }

    #[test]
    fn naked_blank_line_is_context() {
        let diff = "--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n a\n\n";
        let patches = parse_unified_diff(diff).unwrap();
        let h = &patches[0].hunks[0];
        assert_eq!(h.lines[1].kind, LineKind::Context);
        assert_eq!(h.lines[1].text, "");
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let diff = "--- a/x\n+++ b/x\n@@ -1,1 +1,1 @@\n-a\n+b\n\\ No newline at end of file\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches[0].hunks[0].lines.len(), 2);
    }

    #[test]
    fn unrecognized_body_line_is_fatal() {
        let diff = "--- a/x\n+++ b/x\n@@ -1,1 +1,1 @@\n???\n";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(ParseError::UnrecognizedBodyLine(_))
        ));
    }

    #[test]
    fn two_files_in_one_diff() {
        let diff = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n--- a/y\n+++ b/y\n@@ -1 +1 @@\n-c\n+d\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].old_path.as_deref(), Some("x"));
        assert_eq!(patches[1].old_path.as_deref(), Some("y"));
    }

    #[test]
    fn dev_null_path_preserved() {
        let diff = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,1 @@\n+hello\n";
        let patches = parse_unified_diff(diff).unwrap();
        assert_eq!(patches[0].old_path.as_deref(), Some("/dev/null"));
        assert_eq!(patches[0].new_path.as_deref(), Some("new.txt"));
    }
}
