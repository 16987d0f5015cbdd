use serde::{Deserialize, Serialize};

/// Classification of a single line within a [`Hunk`] body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
}

/// One classified line of a hunk body, without its leading `' '`/`+`/`-` prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
}

impl HunkLine {
    pub fn context(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Context, text: text.into() }
    }

    pub fn addition(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Addition, text: text.into() }
    }

    pub fn deletion(text: impl Into<String>) -> Self {
        Self { kind: LineKind::Deletion, text: text.into() }
    }
}

/// A single contiguous edit region, as declared by one `@@` header and its body.
///
/// `old_start`/`new_start` are one-based; `0` is permitted for an absent length.
/// The declared lengths are advisory only — the applier never re-validates them
/// against the body, it only uses `old_start` to seed the anchor search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

/// One file's worth of hunks, with optional old/new path endpoints.
///
/// Paths are normalised by the parser per [`normalize_path`]: any leading `a/`
/// or `b/` is stripped, a trailing tab-delimited timestamp is dropped, and the
/// literal `/dev/null` is preserved verbatim to signal creation/deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilePatch {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

/// Output of a successful [`crate::applier::apply`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyResult {
    /// The patched content, lines joined by `"\n"`.
    pub text: String,
    /// Indices in `text` that were inserted, in the order they were inserted.
    pub added_lines: Vec<usize>,
    /// Indices in the original text that were deleted, strictly ascending.
    pub removed_lines_original: Vec<usize>,
}

/// Normalise a header path: strip a leading `a/`/`b/`, drop a tab-delimited
/// timestamp, trim surrounding whitespace, and pass `/dev/null` through as-is.
pub(crate) fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim_end();
    let without_timestamp = match trimmed.split_once('\t') {
        Some((path, _timestamp)) => path.trim_end(),
        None => trimmed,
    };
    if without_timestamp == "/dev/null" {
        return without_timestamp.to_string();
    }
    let stripped = without_timestamp
        .strip_prefix("a/")
        .or_else(|| without_timestamp.strip_prefix("b/"))
        .unwrap_or(without_timestamp);
    stripped.trim().to_string()
}
