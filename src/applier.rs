//! Fuzzy-anchored hunk application.
//!
//! Each hunk is anchored independently: first at the position implied by its
//! declared `old_start` (adjusted for the net insert/delete bias accumulated
//! so far), then within a widening window of `fuzzy_context` lines either
//! side of that guess, and finally by a full linear scan. A hunk with no
//! context or deletion lines (an insert-only hunk) anchors wherever the
//! guess lands, since there is nothing in the original text for it to match
//! against.

use log::{debug, trace, warn};
use thiserror::Error;

use crate::model::{ApplyResult, FilePatch, Hunk, HunkLine, LineKind};

/// Fatal conditions that abort applying a [`FilePatch`]. Failure is
/// all-or-nothing: no partially-patched text is ever returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("failed to locate hunk starting at old:{old_start} (near line {near_line})")]
    AnchorNotFound { old_start: usize, near_line: usize },
    #[error("context mismatch near line {0}")]
    ContextMismatch(usize),
    #[error("deletion mismatch near line {0}")]
    DeletionMismatch(usize),
}

/// Where a line in the working buffer came from, replacing a reserved
/// sentinel index with an explicit sum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Original(usize),
    Inserted,
}

/// Tunable knobs for [`apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// How many lines either side of the guessed anchor to search before
    /// falling back to a full linear scan.
    pub fuzzy_context: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { fuzzy_context: 5 }
    }
}

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

/// Apply a single file's worth of hunks to `original_text`.
pub fn apply(
    original_text: &str,
    patch: &FilePatch,
    options: ApplyOptions,
) -> Result<ApplyResult, ApplyError> {
    let mut out: Vec<String> = split_lines(original_text).into_iter().map(String::from).collect();
    let mut origin_map: Vec<Origin> = (0..out.len()).map(Origin::Original).collect();
    let mut bias: isize = 0;
    let mut added_lines: Vec<usize> = Vec::new();
    let mut removed_original: Vec<usize> = Vec::new();

    for hunk in &patch.hunks {
        let guess_index = clamp_guess(hunk.old_start as isize - 1 + bias, out.len());
        let anchor = find_hunk_anchor(&out, hunk, guess_index, options.fuzzy_context).ok_or(
            ApplyError::AnchorNotFound { old_start: hunk.old_start, near_line: guess_index + 1 },
        )?;
        trace!("applier: anchored hunk (old_start={}) at line {}", hunk.old_start, anchor + 1);

        verify_hunk(&out, hunk, anchor)?;

        let mut cur = anchor;
        for hl in &hunk.lines {
            match hl.kind {
                LineKind::Context => {
                    if hl.text.is_empty() {
                        while cur < out.len() && out[cur].is_empty() {
                            cur += 1;
                        }
                    } else {
                        cur += 1;
                    }
                }
                LineKind::Deletion => {
                    if let Origin::Original(original_index) = origin_map[cur] {
                        removed_original.push(original_index);
                    }
                    out.remove(cur);
                    origin_map.remove(cur);
                    bias -= 1;
                }
                LineKind::Addition => {
                    out.insert(cur, hl.text.clone());
                    origin_map.insert(cur, Origin::Inserted);
                    added_lines.push(cur);
                    cur += 1;
                    bias += 1;
                }
            }
        }
    }

    removed_original.sort_unstable();
    Ok(ApplyResult { text: out.join("\n"), added_lines, removed_lines_original: removed_original })
}

fn clamp_guess(guess: isize, len: usize) -> usize {
    if guess < 0 {
        0
    } else {
        (guess as usize).min(len)
    }
}

/// Non-mutating pass confirming every context/deletion line of `hunk` matches
/// `lines` starting at `anchor`. Run before any mutation so a failing hunk
/// leaves the buffer untouched.
fn verify_hunk(lines: &[String], hunk: &Hunk, anchor: usize) -> Result<(), ApplyError> {
    let mut cur = anchor;
    for hl in &hunk.lines {
        match hl.kind {
            LineKind::Context => {
                if hl.text.is_empty() {
                    while cur < lines.len() && lines[cur].is_empty() {
                        cur += 1;
                    }
                } else {
                    if cur >= lines.len() || lines[cur] != hl.text {
                        return Err(ApplyError::ContextMismatch(cur + 1));
                    }
                    cur += 1;
                }
            }
            LineKind::Deletion => {
                if cur >= lines.len() || lines[cur] != hl.text {
                    return Err(ApplyError::DeletionMismatch(cur + 1));
                }
                cur += 1;
            }
            LineKind::Addition => {}
        }
    }
    Ok(())
}

fn is_insert_only(hunk: &Hunk) -> bool {
    hunk.lines.iter().all(|hl| hl.kind == LineKind::Addition)
}

fn min_consuming_length(hunk: &Hunk) -> usize {
    hunk.lines
        .iter()
        .filter(|hl| match hl.kind {
            LineKind::Deletion => true,
            LineKind::Context => !hl.text.is_empty(),
            LineKind::Addition => false,
        })
        .count()
}

fn find_hunk_anchor(
    lines: &[String],
    hunk: &Hunk,
    guess_index: usize,
    fuzzy_context: usize,
) -> Option<usize> {
    if is_insert_only(hunk) {
        return Some(guess_index.min(lines.len()));
    }

    let min_need = min_consuming_length(hunk);
    let max_start = lines.len().saturating_sub(min_need);
    let guess = guess_index.min(max_start);

    if hunk_matches_from(lines, hunk, guess) {
        debug!("applier: hunk resolved at guessed position {}", guess + 1);
        return Some(guess);
    }

    for d in 1..=fuzzy_context {
        if let Some(left) = guess.checked_sub(d) {
            if left <= max_start && hunk_matches_from(lines, hunk, left) {
                debug!("applier: hunk resolved via fuzzy window (-{d}) at {}", left + 1);
                return Some(left);
            }
        }
        let right = guess + d;
        if right <= max_start && hunk_matches_from(lines, hunk, right) {
            debug!("applier: hunk resolved via fuzzy window (+{d}) at {}", right + 1);
            return Some(right);
        }
    }

    for pos in 0..=max_start {
        if hunk_matches_from(lines, hunk, pos) {
            debug!("applier: hunk resolved via global scan at {}", pos + 1);
            return Some(pos);
        }
    }

    warn!("applier: failed to anchor hunk near line {}", guess_index + 1);
    None
}

fn hunk_matches_from(lines: &[String], hunk: &Hunk, start: usize) -> bool {
    let mut cur = start;
    let len = lines.len();
    for hl in &hunk.lines {
        match hl.kind {
            LineKind::Addition => continue,
            LineKind::Context => {
                if hl.text.is_empty() {
                    while cur < len && lines[cur].is_empty() {
                        cur += 1;
                    }
                } else {
                    if cur >= len || lines[cur] != hl.text {
                        return false;
                    }
                    cur += 1;
                }
            }
            LineKind::Deletion => {
                if cur >= len || lines[cur] != hl.text {
                    return false;
                }
                cur += 1;
            }
        }
    }
    true
}
