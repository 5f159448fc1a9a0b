//! Classify same-named source/target pairs.

use std::fmt;

use serde::Serialize;

use crate::core::{Skill, normalize_content};
use crate::diff::{DiffHunk, hunks, metadata_equal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    Identical,
    ContentOnly,
    MetadataOnly,
    Both,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Identical => "identical",
            Self::ContentOnly => "content-only",
            Self::MetadataOnly => "metadata-only",
            Self::Both => "both",
        }
    }

    #[must_use]
    pub const fn content_differs(&self) -> bool {
        matches!(self, Self::ContentOnly | Self::Both)
    }

    #[must_use]
    pub const fn metadata_differs(&self) -> bool {
        matches!(self, Self::MetadataOnly | Self::Both)
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source/target pair sharing a name, with the diff between them.
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub name: String,
    pub kind: ConflictKind,
    #[serde(skip)]
    pub source: Skill,
    #[serde(skip)]
    pub target: Skill,
    /// Hunks from target to source content; empty when content is equal
    pub hunks: Vec<DiffHunk>,
}

impl Conflict {
    #[must_use]
    pub const fn is_identical(&self) -> bool {
        matches!(self.kind, ConflictKind::Identical)
    }
}

/// Compare `source` and `target`, ignoring path, platform, scope and mtime.
#[must_use]
pub fn detect(source: &Skill, target: &Skill) -> Conflict {
    let content_equal = normalize_content(&source.content) == normalize_content(&target.content);
    let metadata_equal = metadata_matches(source, target);

    let kind = match (content_equal, metadata_equal) {
        (true, true) => ConflictKind::Identical,
        (false, true) => ConflictKind::ContentOnly,
        (true, false) => ConflictKind::MetadataOnly,
        (false, false) => ConflictKind::Both,
    };
    let hunks = if content_equal {
        Vec::new()
    } else {
        hunks(&source.content, &target.content)
    };

    Conflict {
        name: source.name.clone(),
        kind,
        source: source.clone(),
        target: target.clone(),
        hunks,
    }
}

/// Description, type, trigger and the metadata mapping (order-insensitive).
fn metadata_matches(source: &Skill, target: &Skill) -> bool {
    source.description == target.description
        && source.skill_type == target.skill_type
        && source.trigger == target.trigger
        && metadata_equal(&source.metadata, &target.metadata)
}
