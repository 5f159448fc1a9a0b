//! Supported platforms and their on-disk conventions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::scope::Scope;
use crate::error::{Result, SkillSyncError};

/// Read-only Codex skills shipped system-wide.
pub const CODEX_PLUGIN_ROOT: &str = "/etc/codex";

/// An AI coding tool whose skill layout we can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Claude Code by Anthropic
    ClaudeCode,
    /// Cursor editor
    Cursor,
    /// Codex CLI by OpenAI
    Codex,
}

impl Platform {
    /// Identifier used on the command line, in env var names and in backup paths.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "claudecode",
            Self::Cursor => "cursor",
            Self::Codex => "codex",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::ClaudeCode => "Claude Code",
            Self::Cursor => "Cursor",
            Self::Codex => "Codex",
        }
    }

    /// Name of the per-user / per-repo configuration directory.
    #[must_use]
    pub const fn config_dir_name(&self) -> &'static str {
        match self {
            Self::ClaudeCode => ".claude",
            Self::Cursor => ".cursor",
            Self::Codex => ".codex",
        }
    }

    /// Environment variable that overrides the tier roots for this platform.
    #[must_use]
    pub fn paths_env_var(&self) -> String {
        format!("SKILLSYNC_{}_SKILLS_PATHS", self.as_str().to_uppercase())
    }

    #[must_use]
    pub const fn all() -> &'static [Platform] {
        &[Self::ClaudeCode, Self::Cursor, Self::Codex]
    }

    /// Default tier roots, highest precedence first.
    #[must_use]
    pub fn default_tiers(&self, repo_root: &Path, home: &Path) -> Vec<(Scope, PathBuf)> {
        let dir = self.config_dir_name();
        let mut tiers = Vec::new();
        if repo_root != home {
            tiers.push((Scope::Repo, repo_root.join(dir)));
        }
        tiers.push((Scope::User, home.join(dir)));
        match self {
            Self::ClaudeCode => {
                tiers.push((Scope::Plugin, home.join(".claude/plugins/cache")));
            }
            Self::Cursor => {}
            Self::Codex => {
                tiers.push((Scope::Plugin, PathBuf::from(CODEX_PLUGIN_ROOT)));
            }
        }
        tiers
    }

    /// Canonical file written for skill `name` under the tier root `root`.
    #[must_use]
    pub fn skill_file_path(&self, root: &Path, name: &str) -> PathBuf {
        let skills = skills_dir(root);
        match self {
            Self::ClaudeCode | Self::Codex => skills.join(name).join("SKILL.md"),
            Self::Cursor => skills.join(format!("{name}.md")),
        }
    }
}

/// Resolve the `skills` directory of a tier root.
///
/// A root that is itself named `skills` (and has no nested `skills/`) is
/// taken as the skills directory.
#[must_use]
pub fn skills_dir(root: &Path) -> PathBuf {
    let nested = root.join("skills");
    if !nested.is_dir() && root.file_name().is_some_and(|name| name == "skills") {
        root.to_path_buf()
    } else {
        nested
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SkillSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "claudecode" | "claude-code" | "claude_code" | "claude" => Ok(Self::ClaudeCode),
            "cursor" => Ok(Self::Cursor),
            "codex" => Ok(Self::Codex),
            _ => Err(SkillSyncError::InvalidPlatform(s.to_string())),
        }
    }
}
