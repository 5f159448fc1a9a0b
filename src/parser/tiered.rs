//! Scope-aware reading across several tier roots.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::{Duplicate, ParseFn, ParseReport};
use crate::core::{ParseWarning, Platform, Scope, Skill};
use crate::error::Result;

/// A tier root tagged with its scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedPath {
    pub scope: Scope,
    pub path: PathBuf,
}

impl ScopedPath {
    pub fn new(scope: Scope, path: impl Into<PathBuf>) -> Self {
        Self {
            scope,
            path: path.into(),
        }
    }

    /// Tag `path` with the scope inferred from where it lives.
    #[must_use]
    pub fn inferred(path: PathBuf, repo_root: &Path, home: &Path) -> Self {
        let scope = Scope::infer(&path, repo_root, home);
        Self { scope, path }
    }
}

/// Merged view of several tiers.
#[derive(Debug, Clone, Default)]
pub struct TieredReport {
    /// Winning skill per name, sorted by name
    pub skills: Vec<Skill>,
    /// Entries hidden by a higher-precedence tier
    pub shadowed: Vec<Skill>,
    pub warnings: Vec<ParseWarning>,
    pub duplicates: Vec<Duplicate>,
}

/// Composes a platform parser over an ordered list of tiers.
#[derive(Debug, Clone)]
pub struct TieredParser {
    platform: Platform,
    parse: ParseFn,
    tiers: Vec<ScopedPath>,
}

impl TieredParser {
    #[must_use]
    pub fn new(platform: Platform, tiers: Vec<ScopedPath>) -> Self {
        Self {
            platform,
            parse: platform.parser(),
            tiers,
        }
    }

    /// Tiers from the platform defaults for `repo_root` and `home`.
    #[must_use]
    pub fn with_default_tiers(platform: Platform, repo_root: &Path, home: &Path) -> Self {
        let tiers = platform
            .default_tiers(repo_root, home)
            .into_iter()
            .map(|(scope, path)| ScopedPath::new(scope, path))
            .collect();
        Self::new(platform, tiers)
    }

    /// Keep only tiers whose scope is in `scopes`. An empty slice keeps all.
    #[must_use]
    pub fn with_scopes(mut self, scopes: &[Scope]) -> Self {
        if !scopes.is_empty() {
            self.tiers.retain(|tier| scopes.contains(&tier.scope));
        }
        self
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn tiers(&self) -> &[ScopedPath] {
        &self.tiers
    }

    /// Read every tier and keep, per name, the skill from the highest
    /// precedence scope. Between tiers of equal scope the earlier listed
    /// one wins and the later entry is only shadowed. Duplicates are
    /// reported for collisions inside a single tier.
    pub fn parse(&self) -> Result<TieredReport> {
        let mut report = TieredReport::default();
        let mut winners: BTreeMap<String, Skill> = BTreeMap::new();
        let mut seen_paths = HashSet::new();

        for tier in &self.tiers {
            if !seen_paths.insert(tier.path.clone()) {
                debug!(path = %tier.path.display(), "tier listed twice, skipping");
                continue;
            }
            let parsed = (self.parse)(&tier.path, tier.scope)?;
            report.warnings.extend(parsed.warnings);
            report.duplicates.extend(parsed.duplicates);

            for mut skill in parsed.skills {
                skill.scope = tier.scope;
                match winners.remove(&skill.name) {
                    None => {
                        winners.insert(skill.name.clone(), skill);
                    }
                    Some(current) => {
                        let (winner, loser) = resolve(current, skill, &mut report);
                        report.shadowed.push(loser);
                        winners.insert(winner.name.clone(), winner);
                    }
                }
            }
        }

        report.skills = winners.into_values().collect();
        report
            .shadowed
            .sort_by(|a, b| a.name.cmp(&b.name).then(b.scope.cmp(&a.scope)));
        info!(
            platform = %self.platform,
            skills = report.skills.len(),
            shadowed = report.shadowed.len(),
            warnings = report.warnings.len(),
            "tiered parse complete"
        );
        Ok(report)
    }

    /// Read the tiers of a single scope, without cross-scope merging.
    /// Earlier tiers win name collisions.
    pub fn parse_from_scope(&self, scope: Scope) -> Result<ParseReport> {
        let mut report = ParseReport::default();
        for tier in self.tiers.iter().filter(|tier| tier.scope == scope) {
            let parsed = (self.parse)(&tier.path, tier.scope)?;
            for mut skill in parsed.skills {
                skill.scope = scope;
                report.push_unless_present(skill);
            }
            report.warnings.extend(parsed.warnings);
            report.duplicates.extend(parsed.duplicates);
        }
        Ok(report)
    }
}

/// Pick the winner of a name collision between an existing entry and a
/// newly read one from a later tier.
fn resolve(current: Skill, incoming: Skill, report: &mut TieredReport) -> (Skill, Skill) {
    if current.scope == incoming.scope {
        debug!(
            name = %incoming.name,
            kept = %current.path.display(),
            shadowed = %incoming.path.display(),
            "earlier tier wins"
        );
        return (current, incoming);
    }

    let (winner, loser) = if incoming.scope > current.scope {
        (incoming, current)
    } else {
        (current, incoming)
    };
    if winner.skill_type != loser.skill_type {
        report.warnings.push(ParseWarning::new(
            loser.path.clone(),
            format!(
                "{} '{}' in {} scope is shadowed by {} in {} scope",
                loser.skill_type, loser.name, loser.scope, winner.skill_type, winner.scope
            ),
        ));
    }
    (winner, loser)
}
