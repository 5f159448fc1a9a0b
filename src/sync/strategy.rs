//! Conflict strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillSyncError};

/// Policy applied when a source and target skill with the same name differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Source replaces target
    #[default]
    Overwrite,
    /// Target is left alone
    Skip,
    /// Source replaces target only when its file is newer
    Newer,
    /// Two-way merge, conflict markers where both sides changed
    Merge,
    /// Clean merges only; anything else is surfaced as a conflict
    ThreeWay,
    /// Every difference is handed to a conflict resolver
    Interactive,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
            Self::Newer => "newer",
            Self::Merge => "merge",
            Self::ThreeWay => "three-way",
            Self::Interactive => "interactive",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Strategy] {
        &[
            Self::Overwrite,
            Self::Skip,
            Self::Newer,
            Self::Merge,
            Self::ThreeWay,
            Self::Interactive,
        ]
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = SkillSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "newer" => Ok(Self::Newer),
            "merge" => Ok(Self::Merge),
            "three-way" | "threeway" | "three_way" => Ok(Self::ThreeWay),
            "interactive" => Ok(Self::Interactive),
            _ => Err(SkillSyncError::InvalidStrategy(s.to_string())),
        }
    }
}
