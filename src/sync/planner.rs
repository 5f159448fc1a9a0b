//! Pair source and target skills by name and decide an action for each.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use super::conflict::{Conflict, ConflictKind, detect};
use super::resolver::{Choice, ConflictResolver};
use super::strategy::Strategy;
use crate::core::{Platform, Scope, Skill, SkillOrigin};
use crate::diff::{Prefer, merge, merge_metadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Updated,
    Skipped,
    Merged,
    Conflict,
    Failed,
    Deleted,
}

impl SyncAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Merged => "merged",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }

    /// Whether executing this action touches the filesystem.
    #[must_use]
    pub const fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Merged | Self::Deleted
        )
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where planned writes land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub platform: Platform,
    pub scope: Scope,
    /// Tier root, e.g. `~/.cursor`
    pub root: PathBuf,
}

impl Destination {
    pub fn new(platform: Platform, scope: Scope, root: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            scope,
            root: root.into(),
        }
    }

    /// Canonical writer path for a new skill.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.platform.skill_file_path(&self.root, name)
    }
}

/// One planned step.
#[derive(Debug, Clone)]
pub struct PlanItem {
    pub name: String,
    pub action: SyncAction,
    pub source: Option<Skill>,
    pub target: Option<Skill>,
    pub target_path: PathBuf,
    /// Skill to write for Created/Updated/Merged
    pub write: Option<Skill>,
    pub conflict: Option<Conflict>,
    pub message: String,
}

impl PlanItem {
    /// The skill this item is about, source side first.
    #[must_use]
    pub fn skill(&self) -> Option<&Skill> {
        self.source.as_ref().or(self.target.as_ref())
    }
}

/// Ordered list of steps, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub strategy: Strategy,
    pub items: Vec<PlanItem>,
}

impl Plan {
    #[must_use]
    pub fn count(&self, action: SyncAction) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }

    /// Number of items that would touch the filesystem.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.items.iter().filter(|item| item.action.mutates()).count()
    }

    /// Existing files that executing the plan would overwrite or delete.
    #[must_use]
    pub fn paths_to_back_up(&self) -> Vec<PathBuf> {
        self.items
            .iter()
            .filter(|item| item.action.mutates() && item.target_path.is_file())
            .map(|item| item.target_path.clone())
            .collect()
    }

    /// Ask `resolver` about every conflict and turn each answer into an
    /// action. Only plans built with the interactive strategy defer
    /// conflicts this way.
    pub fn resolve_conflicts(&mut self, resolver: &mut dyn ConflictResolver) {
        if self.strategy != Strategy::Interactive {
            return;
        }
        for item in &mut self.items {
            if item.action != SyncAction::Conflict {
                continue;
            }
            let Some(conflict) = item.conflict.as_ref() else {
                continue;
            };
            let choice = resolver.resolve(conflict);
            debug!(name = %item.name, %choice, "conflict resolved");
            let (source, target) = (&conflict.source, &conflict.target);
            match choice {
                Choice::UseSource => {
                    item.write = Some(overwrite_with(source, target));
                    item.action = SyncAction::Updated;
                    item.message = "source chosen".to_string();
                }
                Choice::UseTarget => {
                    item.action = SyncAction::Skipped;
                    item.message = "target kept".to_string();
                }
                Choice::Merge => {
                    let (merged, conflicts) = merged_with(source, target);
                    item.write = Some(merged);
                    item.action = SyncAction::Merged;
                    item.message = merge_message(conflicts);
                }
                Choice::Skip => {
                    item.action = SyncAction::Skipped;
                    item.message = "skipped by choice".to_string();
                }
            }
        }
    }
}

/// Build a plan for every name in `source ∪ target`.
#[must_use]
pub fn plan(
    source: &[Skill],
    target: &[Skill],
    strategy: Strategy,
    delete: bool,
    dest: &Destination,
) -> Plan {
    let mut pairs: BTreeMap<&str, (Option<&Skill>, Option<&Skill>)> = BTreeMap::new();
    for skill in source {
        pairs.entry(skill.name.as_str()).or_default().0 = Some(skill);
    }
    for skill in target {
        pairs.entry(skill.name.as_str()).or_default().1 = Some(skill);
    }

    let items = pairs
        .into_values()
        .filter_map(|pair| match pair {
            (Some(source), Some(target)) => Some(paired(source, target, strategy, dest)),
            (Some(source), None) => Some(created(source, dest)),
            (None, Some(target)) => Some(target_only(target, delete)),
            (None, None) => None,
        })
        .collect();
    Plan { strategy, items }
}

fn created(source: &Skill, dest: &Destination) -> PlanItem {
    let path = dest.path_for(&source.name);
    PlanItem {
        name: source.name.clone(),
        action: SyncAction::Created,
        source: Some(source.clone()),
        target: None,
        target_path: path.clone(),
        write: Some(source.retarget(dest.platform, dest.scope, path)),
        conflict: None,
        message: "new in target".to_string(),
    }
}

fn target_only(target: &Skill, delete: bool) -> PlanItem {
    let (action, message) = match (delete, target.origin) {
        (true, SkillOrigin::File) => (SyncAction::Deleted, "not in source"),
        (true, SkillOrigin::Aggregate) => (SyncAction::Skipped, "aggregate entry is read-only"),
        (false, _) => (SyncAction::Skipped, "only in target"),
    };
    PlanItem {
        name: target.name.clone(),
        action,
        source: None,
        target: Some(target.clone()),
        target_path: target.path.clone(),
        write: None,
        conflict: None,
        message: message.to_string(),
    }
}

fn paired(source: &Skill, target: &Skill, strategy: Strategy, dest: &Destination) -> PlanItem {
    // Aggregate entries are never rewritten in place; a canonical file
    // shadows them instead.
    let mut target = target.clone();
    if target.origin == SkillOrigin::Aggregate {
        target.path = dest.path_for(&target.name);
        target.origin = SkillOrigin::File;
    }
    let target = &target;
    let conflict = detect(source, target);

    let mut item = PlanItem {
        name: source.name.clone(),
        action: SyncAction::Skipped,
        source: Some(source.clone()),
        target: Some(target.clone()),
        target_path: target.path.clone(),
        write: None,
        conflict: None,
        message: String::new(),
    };

    if conflict.is_identical() {
        item.message = "identical".to_string();
        return item;
    }

    match strategy {
        Strategy::Overwrite => {
            item.action = SyncAction::Updated;
            item.write = Some(overwrite_with(source, target));
            item.message = format!("{} differs, source wins", conflict.kind);
        }
        Strategy::Skip => {
            item.message = format!("{} differs, target kept", conflict.kind);
        }
        Strategy::Newer => {
            if is_newer(source, target) {
                item.action = SyncAction::Updated;
                item.write = Some(overwrite_with(source, target));
                item.message = "source is newer".to_string();
            } else {
                item.message = "target is newer or the same age".to_string();
            }
        }
        Strategy::Merge => {
            let (merged, conflicts) = merged_with(source, target);
            item.action = SyncAction::Merged;
            item.write = Some(merged);
            item.message = merge_message(conflicts);
        }
        Strategy::ThreeWay => match conflict.kind {
            ConflictKind::ContentOnly => {
                let result = merge(&source.content, &target.content);
                if result.is_clean() {
                    let mut merged = target.clone();
                    merged.content = result.content;
                    item.action = SyncAction::Merged;
                    item.write = Some(merged);
                    item.message = "merged cleanly".to_string();
                } else {
                    item.action = SyncAction::Conflict;
                    item.message = format!("{} conflicting region(s)", result.conflicts);
                }
            }
            ConflictKind::MetadataOnly | ConflictKind::Both => {
                item.action = SyncAction::Conflict;
                item.message = format!("{} differs", conflict.kind);
            }
            ConflictKind::Identical => {}
        },
        Strategy::Interactive => {
            item.action = SyncAction::Conflict;
            item.message = format!("{} differs, awaiting choice", conflict.kind);
        }
    }

    item.conflict = Some(conflict);
    item
}

/// Source content and typed fields, metadata merged with source winning,
/// written to the target's existing file.
fn overwrite_with(source: &Skill, target: &Skill) -> Skill {
    let mut skill = source.retarget(target.platform, target.scope, target.path.clone());
    skill.metadata = merge_metadata(&source.metadata, &target.metadata, Prefer::Source);
    skill
}

fn merged_with(source: &Skill, target: &Skill) -> (Skill, usize) {
    let result = merge(&source.content, &target.content);
    let mut skill = overwrite_with(source, target);
    skill.content = result.content;
    (skill, result.conflicts)
}

fn merge_message(conflicts: usize) -> String {
    if conflicts == 0 {
        "merged cleanly".to_string()
    } else {
        format!("merged with {conflicts} conflict marker block(s)")
    }
}

fn is_newer(source: &Skill, target: &Skill) -> bool {
    match (source.mod_time, target.mod_time) {
        (Some(source), Some(target)) => source > target,
        (Some(_), None) => true,
        _ => false,
    }
}
