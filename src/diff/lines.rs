//! Longest-common-subsequence line diff and hunk extraction.
//!
//! The diff is taken from the target (old) to the source (new): lines only
//! in the target are [`LineKind::Removed`], lines only in the source are
//! [`LineKind::Added`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::normalize_content;

/// Lines of context kept on each side of a change.
pub const CONTEXT_LINES: usize = 3;

/// Largest LCS table (target x source lines of the changed span) built
/// before falling back to a wholesale replacement.
pub const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

impl LineKind {
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Context => ' ',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line text without its newline
    pub text: String,
}

/// A contiguous changed region plus surrounding context.
///
/// Start/count pairs cover the changed span only (1-based). When a count is
/// zero the start is the line just before the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub source_start: usize,
    pub source_count: usize,
    pub target_start: usize,
    pub target_count: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// `@@ -<target> +<source> @@`
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.target_start, self.target_count, self.source_start, self.source_count
        )
    }

    #[must_use]
    pub fn added(&self) -> usize {
        self.lines.iter().filter(|l| l.kind == LineKind::Added).count()
    }

    #[must_use]
    pub fn removed(&self) -> usize {
        self.lines.iter().filter(|l| l.kind == LineKind::Removed).count()
    }
}

impl fmt::Display for DiffHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        for line in &self.lines {
            writeln!(f, "{}{}", line.kind.prefix(), line.text)?;
        }
        Ok(())
    }
}

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
    pub kind: LineKind,
    /// Target lines consumed before this step
    pub target_pos: usize,
    /// Source lines consumed before this step
    pub source_pos: usize,
}

/// Split normalized content into lines without their newline.
#[must_use]
pub fn split_lines(content: &str) -> Vec<&str> {
    match content.strip_suffix('\n') {
        Some(rest) => rest.split('\n').collect(),
        None if content.is_empty() => Vec::new(),
        None => content.split('\n').collect(),
    }
}

/// Edit script turning `target` into `source`. Within a changed run,
/// removals come before additions.
#[must_use]
pub fn edit_script(source: &[&str], target: &[&str]) -> Vec<Op> {
    let prefix = source
        .iter()
        .zip(target)
        .take_while(|(s, t)| s == t)
        .count();
    let suffix = source[prefix..]
        .iter()
        .rev()
        .zip(target[prefix..].iter().rev())
        .take_while(|(s, t)| s == t)
        .count();

    let src = &source[prefix..source.len() - suffix];
    let tgt = &target[prefix..target.len() - suffix];

    let mut ops = Vec::with_capacity(source.len().max(target.len()) + 1);
    for i in 0..prefix {
        ops.push(Op {
            kind: LineKind::Context,
            target_pos: i,
            source_pos: i,
        });
    }

    if tgt.len().saturating_mul(src.len()) > MAX_LCS_CELLS {
        debug!(
            source_lines = src.len(),
            target_lines = tgt.len(),
            "diff too large for LCS, replacing changed span wholesale"
        );
        ops.extend((0..tgt.len()).map(|i| Op {
            kind: LineKind::Removed,
            target_pos: prefix + i,
            source_pos: prefix,
        }));
        ops.extend((0..src.len()).map(|j| Op {
            kind: LineKind::Added,
            target_pos: prefix + tgt.len(),
            source_pos: prefix + j,
        }));
    } else {
        lcs_ops(src, tgt, prefix, &mut ops);
    }

    let (t_end, s_end) = (prefix + tgt.len(), prefix + src.len());
    for k in 0..suffix {
        ops.push(Op {
            kind: LineKind::Context,
            target_pos: t_end + k,
            source_pos: s_end + k,
        });
    }
    ops
}

/// LCS walk over the trimmed middle, appending ops offset by `prefix`.
fn lcs_ops(src: &[&str], tgt: &[&str], prefix: usize, ops: &mut Vec<Op>) {
    // lcs[i * width + j] = LCS length of tgt[i..] and src[j..]
    let width = src.len() + 1;
    let mut lcs = vec![0u32; (tgt.len() + 1) * width];
    for i in (0..tgt.len()).rev() {
        for j in (0..src.len()).rev() {
            lcs[i * width + j] = if tgt[i] == src[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < tgt.len() || j < src.len() {
        let kind = if i < tgt.len() && j < src.len() && tgt[i] == src[j] {
            LineKind::Context
        } else if j == src.len()
            || (i < tgt.len() && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1])
        {
            LineKind::Removed
        } else {
            LineKind::Added
        };
        ops.push(Op {
            kind,
            target_pos: prefix + i,
            source_pos: prefix + j,
        });
        match kind {
            LineKind::Context => {
                i += 1;
                j += 1;
            }
            LineKind::Removed => i += 1,
            LineKind::Added => j += 1,
        }
    }
}

/// Hunks between `source` and `target`, in file order.
///
/// Both sides are normalized to a single trailing newline first.
#[must_use]
pub fn hunks(source: &str, target: &str) -> Vec<DiffHunk> {
    let source = normalize_content(source);
    let target = normalize_content(target);
    let src = split_lines(&source);
    let tgt = split_lines(&target);
    let ops = edit_script(&src, &tgt);
    group(&ops, &src, &tgt)
}

fn group(ops: &[Op], source: &[&str], target: &[&str]) -> Vec<DiffHunk> {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.kind != LineKind::Context)
        .map(|(idx, _)| idx)
        .collect();
    let Some((&first, rest)) = changes.split_first() else {
        return Vec::new();
    };

    let mut spans = Vec::new();
    let (mut start, mut end) = (first, first);
    for &idx in rest {
        if idx - end - 1 <= 2 * CONTEXT_LINES {
            end = idx;
        } else {
            spans.push((start, end));
            start = idx;
            end = idx;
        }
    }
    spans.push((start, end));

    spans
        .into_iter()
        .map(|(first, last)| build_hunk(ops, first, last, source, target))
        .collect()
}

fn build_hunk(ops: &[Op], first: usize, last: usize, source: &[&str], target: &[&str]) -> DiffHunk {
    let ctx_start = first.saturating_sub(CONTEXT_LINES);
    let ctx_end = (last + CONTEXT_LINES).min(ops.len() - 1);

    let lines = ops[ctx_start..=ctx_end]
        .iter()
        .map(|op| {
            let text = match op.kind {
                LineKind::Added => source[op.source_pos],
                LineKind::Removed | LineKind::Context => target[op.target_pos],
            };
            DiffLine {
                kind: op.kind,
                text: text.to_string(),
            }
        })
        .collect();

    let span = &ops[first..=last];
    let source_count = span.iter().filter(|op| op.kind != LineKind::Removed).count();
    let target_count = span.iter().filter(|op| op.kind != LineKind::Added).count();
    let start = |pos: usize, count: usize| if count == 0 { pos } else { pos + 1 };

    DiffHunk {
        source_start: start(ops[first].source_pos, source_count),
        source_count,
        target_start: start(ops[first].target_pos, target_count),
        target_count,
        lines,
    }
}

/// Unified rendering of a list of hunks.
#[must_use]
pub fn render_unified(hunks: &[DiffHunk]) -> String {
    hunks.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_has_no_hunks() {
        assert!(hunks("a\nb\n", "a\nb").is_empty());
        assert!(hunks("", "\n\n").is_empty());
    }

    #[test]
    fn single_line_change() {
        let hunks = hunks("line1\nSRC\nline3", "line1\nTGT\nline3");
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(hunk.header(), "@@ -2,1 +2,1 @@");
        assert_eq!(
            hunk.to_string(),
            "@@ -2,1 +2,1 @@\n line1\n-TGT\n+SRC\n line3\n"
        );
    }

    #[test]
    fn oversized_change_is_replaced_wholesale() {
        let lines = 2_100;
        let target: String = (0..lines).map(|i| format!("old {i}\n")).collect();
        let source: String = (0..lines).map(|i| format!("new {i}\n")).collect();
        let source = format!("head\n{source}tail\n");
        let target = format!("head\n{target}tail\n");
        assert!(lines * lines > MAX_LCS_CELLS);

        let hunks = hunks(&source, &target);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].removed(), lines);
        assert_eq!(hunks[0].added(), lines);
        assert_eq!(hunks[0].header(), "@@ -2,2100 +2,2100 @@");
        let first_change = hunks[0]
            .lines
            .iter()
            .position(|line| line.kind != LineKind::Context)
            .unwrap();
        assert_eq!(hunks[0].lines[first_change].text, "old 0");
    }

    #[test]
    fn pure_insertion_uses_preceding_line() {
        let hunks = hunks("a\nb\nnew\nc\n", "a\nb\nc\n");
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].header(), "@@ -2,0 +3,1 @@");
        assert_eq!(hunks[0].added(), 1);
        assert_eq!(hunks[0].removed(), 0);
    }

    #[test]
    fn insertion_at_start_of_empty_target() {
        let hunks = hunks("x\ny\n", "");
        assert_eq!(hunks[0].header(), "@@ -0,0 +1,2 @@");
    }

    #[test]
    fn context_limited_to_three_lines() {
        let target = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let source = "1\n2\n3\n4\nX\n6\n7\n8\n9\n";
        let hunks = hunks(source, target);
        let context: Vec<&str> = hunks[0]
            .lines
            .iter()
            .filter(|l| l.kind == LineKind::Context)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(context, vec!["2", "3", "4", "6", "7", "8"]);
    }

    #[test]
    fn distant_changes_split_close_changes_join() {
        let edit = |changed: &[usize]| -> String {
            (1..=20)
                .map(|n| {
                    if changed.contains(&n) {
                        format!("x{n}\n")
                    } else {
                        format!("{n}\n")
                    }
                })
                .collect()
        };
        let original = edit(&[]);
        assert_eq!(hunks(&edit(&[2, 18]), &original).len(), 2);

        let joined = hunks(&edit(&[2, 8]), &original);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].header(), "@@ -2,7 +2,7 @@");
    }

    #[test]
    fn removals_precede_additions() {
        let ops = edit_script(&["a", "new", "c"], &["a", "old", "c"]);
        let kinds: Vec<LineKind> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Context,
                LineKind::Removed,
                LineKind::Added,
                LineKind::Context
            ]
        );
    }

    #[test]
    fn render_concatenates_hunks() {
        let rendered = render_unified(&hunks("a\n", "b\n"));
        assert_eq!(rendered, "@@ -1,1 +1,1 @@\n-b\n+a\n");
    }
}
