//! Installation scopes and their precedence.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::platform::CODEX_PLUGIN_ROOT;
use crate::error::{Result, SkillSyncError};
use crate::security::{is_under_root, normalize_path};

/// Tier at which a skill is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Builtin,
    System,
    Admin,
    User,
    Repo,
    /// Skills shipped by Claude Code plugins
    Plugin,
}

impl Scope {
    /// Higher wins when two tiers provide the same skill name.
    ///
    /// Plugin sits just above Builtin so anything a user or admin installs
    /// shadows a plugin-provided skill.
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Builtin => 0,
            Self::Plugin => 1,
            Self::System => 2,
            Self::Admin => 3,
            Self::User => 4,
            Self::Repo => 5,
        }
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::User | Self::Repo)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::System => "system",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Repo => "repo",
            Self::Plugin => "plugin",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Scope] {
        &[
            Self::Repo,
            Self::User,
            Self::Admin,
            Self::System,
            Self::Plugin,
            Self::Builtin,
        ]
    }

    /// Infer the scope of `path` from where it lives.
    ///
    /// Plugin roots (Claude Code plugin caches, `/etc/codex`) win over
    /// everything else, then the repository, then system-wide prefixes.
    /// Anything else is User.
    /// `..` segments are resolved lexically before matching.
    #[must_use]
    pub fn infer(path: &Path, repo_root: &Path, home: &Path) -> Self {
        let path = normalize_path(path);
        if is_plugin_cache(&path) || path.starts_with(CODEX_PLUGIN_ROOT) {
            return Self::Plugin;
        }
        if repo_root != home && is_under_root(&path, repo_root) {
            return Self::Repo;
        }
        if path.starts_with("/etc") {
            return Self::Admin;
        }
        if path.starts_with("/opt") || path.starts_with("/usr") {
            return Self::System;
        }
        Self::User
    }
}

fn is_plugin_cache(path: &Path) -> bool {
    let parts: Vec<&std::ffi::OsStr> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    parts
        .windows(2)
        .any(|pair| pair[0] == "plugins" && pair[1] == "cache")
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scope {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.precedence().cmp(&other.precedence())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = SkillSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "system" => Ok(Self::System),
            "admin" => Ok(Self::Admin),
            "user" | "global" => Ok(Self::User),
            "repo" | "project" => Ok(Self::Repo),
            "plugin" | "plugins" => Ok(Self::Plugin),
            _ => Err(SkillSyncError::InvalidScope(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order() {
        assert!(Scope::Repo > Scope::User);
        assert!(Scope::User > Scope::Admin);
        assert!(Scope::Admin > Scope::System);
        assert!(Scope::System > Scope::Plugin);
        assert!(Scope::Plugin > Scope::Builtin);
    }

    #[test]
    fn only_user_and_repo_are_writable() {
        let writable: Vec<Scope> = Scope::all()
            .iter()
            .copied()
            .filter(Scope::is_writable)
            .collect();
        assert_eq!(writable, vec![Scope::Repo, Scope::User]);
    }

    #[test]
    fn infer_scope_from_path() {
        let repo = Path::new("/home/u/work/project");
        let home = Path::new("/home/u");
        assert_eq!(
            Scope::infer(Path::new("/home/u/.claude/plugins/cache/m/p/1.0.0"), repo, home),
            Scope::Plugin
        );
        assert_eq!(
            Scope::infer(Path::new("/home/u/work/project/.claude"), repo, home),
            Scope::Repo
        );
        assert_eq!(Scope::infer(Path::new("/home/u/.cursor"), repo, home), Scope::User);
        assert_eq!(Scope::infer(Path::new("/etc/codex"), repo, home), Scope::Plugin);
        assert_eq!(Scope::infer(Path::new("/etc/codex/skills"), repo, home), Scope::Plugin);
        assert_eq!(Scope::infer(Path::new("/etc/agents"), repo, home), Scope::Admin);
        assert_eq!(Scope::infer(Path::new("/opt/codex"), repo, home), Scope::System);
        assert_eq!(Scope::infer(Path::new("/srv/skills"), repo, home), Scope::User);
        assert_eq!(
            Scope::infer(Path::new("/home/u/work/project/../other/.claude"), repo, home),
            Scope::User
        );
    }

    #[test]
    fn infer_is_deterministic_when_repo_is_home() {
        let home = Path::new("/home/u");
        assert_eq!(Scope::infer(Path::new("/home/u/.claude"), home, home), Scope::User);
    }

    #[test]
    fn parse_scope() {
        assert_eq!("repo".parse::<Scope>().unwrap(), Scope::Repo);
        assert_eq!("USER".parse::<Scope>().unwrap(), Scope::User);
        assert!("galaxy".parse::<Scope>().is_err());
    }
}
