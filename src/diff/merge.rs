//! Two-way merge with conflict markers, and metadata merge.
//!
//! There is no common ancestor: runs both sides agree on are kept once,
//! a run present on only one side is kept, and a run where both sides
//! differ is wrapped in conflict markers.

use serde::Serialize;
use serde_yaml::Mapping;

use super::lines::{LineKind, edit_script, split_lines};
use crate::core::normalize_content;

pub const MARKER_SOURCE: &str = "<<<<<<< source";
pub const MARKER_SEPARATOR: &str = "=======";
pub const MARKER_TARGET: &str = ">>>>>>> target";

/// Merged text and the number of conflict blocks it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub content: String,
    pub conflicts: usize,
}

impl MergeResult {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.conflicts == 0
    }
}

/// Merge `source` and `target` line by line.
#[must_use]
pub fn merge(source: &str, target: &str) -> MergeResult {
    let source = normalize_content(source);
    let target = normalize_content(target);
    let src = split_lines(&source);
    let tgt = split_lines(&target);
    let ops = edit_script(&src, &tgt);

    let mut out: Vec<&str> = Vec::with_capacity(src.len().max(tgt.len()));
    let mut conflicts = 0;
    let mut removed: Vec<&str> = Vec::new();
    let mut added: Vec<&str> = Vec::new();

    for op in &ops {
        match op.kind {
            LineKind::Context => {
                conflicts += usize::from(flush(&mut out, &mut removed, &mut added));
                out.push(tgt[op.target_pos]);
            }
            LineKind::Removed => removed.push(tgt[op.target_pos]),
            LineKind::Added => added.push(src[op.source_pos]),
        }
    }
    conflicts += usize::from(flush(&mut out, &mut removed, &mut added));

    let mut content = out.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    MergeResult {
        content: normalize_content(&content),
        conflicts,
    }
}

/// Emit one divergent run. Returns whether it needed conflict markers.
fn flush<'a>(out: &mut Vec<&'a str>, removed: &mut Vec<&'a str>, added: &mut Vec<&'a str>) -> bool {
    match (added.is_empty(), removed.is_empty()) {
        (true, true) => false,
        (false, true) => {
            out.append(added);
            false
        }
        (true, false) => {
            out.append(removed);
            false
        }
        (false, false) => {
            out.push(MARKER_SOURCE);
            out.append(added);
            out.push(MARKER_SEPARATOR);
            out.append(removed);
            out.push(MARKER_TARGET);
            true
        }
    }
}

/// Which side's value survives when both define a key differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    Source,
    Target,
}

/// Merge frontmatter metadata.
///
/// Keys on one side only are kept; keys on both sides take the preferred
/// side's value. Source key order comes first, then target-only keys.
#[must_use]
pub fn merge_metadata(source: &Mapping, target: &Mapping, prefer: Prefer) -> Mapping {
    let mut merged = Mapping::new();
    for (key, value) in source {
        let chosen = match (prefer, target.get(key)) {
            (Prefer::Target, Some(existing)) => existing.clone(),
            _ => value.clone(),
        };
        merged.insert(key.clone(), chosen);
    }
    for (key, value) in target {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Order-insensitive equality of two metadata mappings.
#[must_use]
pub fn metadata_equal(a: &Mapping, b: &Mapping) -> bool {
    a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn map(pairs: &[(&str, &str)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (Value::from(*k), Value::from(*v)))
            .collect()
    }

    #[test]
    fn identical_inputs_merge_cleanly() {
        let merged = merge("a\nb\n", "a\nb");
        assert!(merged.is_clean());
        assert_eq!(merged.content, "a\nb\n");
    }

    #[test]
    fn one_sided_runs_are_kept() {
        let merged = merge("a\nsrc only\nb\n", "a\nb\ntgt only\n");
        assert!(merged.is_clean());
        assert_eq!(merged.content, "a\nsrc only\nb\ntgt only\n");
    }

    #[test]
    fn divergent_run_gets_markers() {
        let merged = merge("line1\nSRC\nline3", "line1\nTGT\nline3");
        assert_eq!(merged.conflicts, 1);
        assert_eq!(
            merged.content,
            "line1\n<<<<<<< source\nSRC\n=======\nTGT\n>>>>>>> target\nline3\n"
        );
    }

    #[test]
    fn empty_sides() {
        assert_eq!(merge("", "").content, "");
        assert_eq!(merge("x\n", "").content, "x\n");
        assert_eq!(merge("", "y\n").content, "y\n");
    }

    #[test]
    fn metadata_prefers_requested_side() {
        let source = map(&[("tools", "Bash"), ("license", "MIT")]);
        let target = map(&[("tools", "Read"), ("globs", "*.rs")]);

        let merged = merge_metadata(&source, &target, Prefer::Source);
        assert_eq!(merged, map(&[("tools", "Bash"), ("license", "MIT"), ("globs", "*.rs")]));

        let merged = merge_metadata(&source, &target, Prefer::Target);
        assert_eq!(merged.get("tools"), Some(&Value::from("Read")));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn metadata_equality_ignores_order() {
        let a = map(&[("a", "1"), ("b", "2")]);
        let b = map(&[("b", "2"), ("a", "1")]);
        assert!(metadata_equal(&a, &b));
        assert!(!metadata_equal(&a, &map(&[("a", "1")])));
        assert!(!metadata_equal(&a, &map(&[("a", "1"), ("b", "3")])));
    }
}
