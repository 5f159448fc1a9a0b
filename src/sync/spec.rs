//! `<platform>[:<scope>[,<scope>]*]` endpoint specs.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::{Platform, Scope};
use crate::error::{Result, SkillSyncError};

/// One side of a sync: a platform and optionally a subset of its scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSpec {
    pub platform: Platform,
    /// Empty means every tier of the platform
    pub scopes: Vec<Scope>,
}

impl SyncSpec {
    #[must_use]
    pub const fn new(platform: Platform) -> Self {
        Self {
            platform,
            scopes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Whether this spec reads from `scope`.
    #[must_use]
    pub fn covers(&self, scope: Scope) -> bool {
        self.scopes.is_empty() || self.scopes.contains(&scope)
    }

    /// The single writable scope this spec names as a target.
    ///
    /// Defaults to `User` when no scope is given.
    pub fn target_scope(&self) -> Result<Scope> {
        let scope = match self.scopes.as_slice() {
            [] => Scope::User,
            [scope] => *scope,
            _ => {
                return Err(SkillSyncError::InvalidSpec {
                    spec: self.to_string(),
                    reason: "a target accepts at most one scope".to_string(),
                });
            }
        };
        if !scope.is_writable() {
            return Err(SkillSyncError::ReadOnlyScope(scope.to_string()));
        }
        Ok(scope)
    }
}

/// Check a source/target pair and return the target scope.
pub fn validate_endpoints(source: &SyncSpec, target: &SyncSpec) -> Result<Scope> {
    let scope = target.target_scope()?;
    if source.platform == target.platform && source.covers(scope) {
        return Err(SkillSyncError::SameSourceAndTarget(format!(
            "{}:{scope}",
            target.platform
        )));
    }
    Ok(scope)
}

impl FromStr for SyncSpec {
    type Err = SkillSyncError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| SkillSyncError::InvalidSpec {
            spec: raw.to_string(),
            reason: reason.to_string(),
        };

        let raw_trimmed = raw.trim();
        if raw_trimmed.is_empty() {
            return Err(invalid("empty spec"));
        }
        let (platform, scopes) = match raw_trimmed.split_once(':') {
            Some((platform, scopes)) => (platform, Some(scopes)),
            None => (raw_trimmed, None),
        };
        let mut spec = Self::new(platform.parse()?);
        if let Some(scopes) = scopes {
            if scopes.trim().is_empty() {
                return Err(invalid("expected at least one scope after ':'"));
            }
            for part in scopes.split(',') {
                if part.trim().is_empty() {
                    return Err(invalid("empty scope in list"));
                }
                spec = spec.with_scope(part.parse()?);
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for SyncSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform.as_str())?;
        if !self.scopes.is_empty() {
            let scopes: Vec<&str> = self.scopes.iter().map(Scope::as_str).collect();
            write!(f, ":{}", scopes.join(","))?;
        }
        Ok(())
    }
}
