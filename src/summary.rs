//! Pure, no-I/O helpers for summarising and re-serialising a [`FilePatch`].

use crate::model::{FilePatch, LineKind};

/// Count additions, deletions, and hunks in a file patch.
pub fn summarize(patch: &FilePatch) -> (usize, usize, usize) {
    let mut additions = 0;
    let mut deletions = 0;
    for hunk in &patch.hunks {
        for line in &hunk.lines {
            match line.kind {
                LineKind::Addition => additions += 1,
                LineKind::Deletion => deletions += 1,
                LineKind::Context => {}
            }
        }
    }
    (additions, deletions, patch.hunks.len())
}

/// Render a single-file unified diff (headers and hunks) back to text.
/// Missing paths fall back to `/dev/null`, mirroring how the parser reads
/// creation/deletion headers.
pub fn format_file_diff(patch: &FilePatch) -> String {
    let old_path = patch.old_path.as_deref().unwrap_or("/dev/null");
    let new_path = patch.new_path.as_deref().unwrap_or("/dev/null");
    let mut out = vec![format!("--- a/{old_path}"), format!("+++ b/{new_path}")];
    for hunk in &patch.hunks {
        out.push(format!(
            "@@ -{},{} +{},{} @@",
            hunk.old_start, hunk.old_len, hunk.new_start, hunk.new_len
        ));
        for line in &hunk.lines {
            let prefix = match line.kind {
                LineKind::Context => ' ',
                LineKind::Addition => '+',
                LineKind::Deletion => '-',
            };
            out.push(format!("{prefix}{}", line.text));
        }
    }
    out.join("\n")
}
