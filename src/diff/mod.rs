//! Line diff, hunks, two-way merge and metadata merge.

pub mod lines;
pub mod merge;

pub use lines::{CONTEXT_LINES, DiffHunk, DiffLine, LineKind, hunks, render_unified};
pub use merge::{MergeResult, Prefer, merge, merge_metadata, metadata_equal};
