//! Apply a plan to the target tree.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::cancel::CancelFlag;
use super::conflict::Conflict;
use super::planner::{Destination, Plan, PlanItem, SyncAction};
use super::strategy::Strategy;
use crate::backup::BackupStore;
use crate::core::{ParseWarning, Skill, SkillType, skills_dir};
use crate::error::{Result, SkillSyncError};
use crate::utils::{atomic_write, read_optional, remove_file_pruning};

/// Outcome for one skill.
#[derive(Debug, Clone, Serialize)]
pub struct SkillResult {
    pub name: String,
    #[serde(rename = "type")]
    pub skill_type: SkillType,
    pub action: SyncAction,
    pub target_path: PathBuf,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<Conflict>,
    /// Skill as written, or as found when nothing was written
    #[serde(skip)]
    pub skill: Option<Skill>,
}

impl SkillResult {
    fn from_item(item: PlanItem) -> Self {
        let skill = item
            .write
            .or_else(|| item.source.clone())
            .or_else(|| item.target.clone());
        Self {
            name: item.name,
            skill_type: skill.as_ref().map(|s| s.skill_type).unwrap_or_default(),
            action: item.action,
            target_path: item.target_path,
            message: item.message,
            error: None,
            conflict: item.conflict,
            skill,
        }
    }

    fn failed(mut self, message: impl Into<String>, error: Option<String>) -> Self {
        self.action = SyncAction::Failed;
        self.message = message.into();
        self.error = error;
        self
    }
}

/// Everything a sync did (or would do, under dry run).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub strategy: Strategy,
    pub dry_run: bool,
    pub skills: Vec<SkillResult>,
    pub errors: Vec<String>,
    pub warnings: Vec<ParseWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
}

impl SyncResult {
    #[must_use]
    pub fn count(&self, action: SyncAction) -> usize {
        self.skills.iter().filter(|s| s.action == action).count()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.count(SyncAction::Failed) > 0
    }

    /// Number of files written or removed.
    #[must_use]
    pub fn changed(&self) -> usize {
        if self.dry_run {
            return 0;
        }
        self.skills.iter().filter(|s| s.action.mutates()).count()
    }

    /// `SyncFailed` when any item failed.
    pub fn into_result(self) -> Result<Self> {
        let failed = self.count(SyncAction::Failed);
        if failed > 0 {
            return Err(SkillSyncError::SyncFailed {
                failed,
                total: self.skills.len(),
            });
        }
        Ok(self)
    }
}

/// Writes plan items serially, in plan order.
pub struct Executor<'a> {
    destination: &'a Destination,
    backup: Option<&'a BackupStore>,
    cancel: CancelFlag,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(destination: &'a Destination) -> Self {
        Self {
            destination,
            backup: None,
            cancel: CancelFlag::default(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_backup(mut self, store: &'a BackupStore) -> Self {
        self.backup = Some(store);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the plan. Only a failed backup aborts; per-item errors are
    /// recorded as `Failed` results.
    pub fn execute(&self, plan: Plan) -> Result<SyncResult> {
        self.execute_observed(plan, |_| {})
    }

    /// [`Executor::execute`], calling `observe` after each item is settled.
    pub fn execute_observed(
        &self,
        plan: Plan,
        mut observe: impl FnMut(&SkillResult),
    ) -> Result<SyncResult> {
        let mut result = SyncResult {
            strategy: plan.strategy,
            dry_run: self.dry_run,
            ..SyncResult::default()
        };

        if !self.dry_run {
            if let Some(store) = self.backup {
                let paths = plan.paths_to_back_up();
                if !paths.is_empty() {
                    let backup = store.snapshot(self.destination.platform, &paths)?;
                    result.backup_id = Some(backup.id);
                }
            }
        }

        for item in plan.items {
            let planned = item.action;
            let skill = item.write.clone();
            let outcome = SkillResult::from_item(item);

            let settled = if self.dry_run || !planned.mutates() {
                outcome
            } else if self.cancel.is_cancelled() {
                outcome.failed("cancelled", None)
            } else {
                match self.apply(planned, &outcome.target_path, skill.as_ref()) {
                    Ok(()) => {
                        debug!(name = %outcome.name, action = %planned, path = %outcome.target_path.display(), "applied");
                        outcome
                    }
                    Err(err) => {
                        warn!(name = %outcome.name, error = %err, "write failed");
                        result.errors.push(format!("{}: {err}", outcome.name));
                        let message = format!("{planned} failed");
                        outcome.failed(message, Some(err.to_string()))
                    }
                }
            };
            observe(&settled);
            result.skills.push(settled);
        }

        info!(
            platform = %self.destination.platform,
            dry_run = self.dry_run,
            changed = result.changed(),
            failed = result.count(SyncAction::Failed),
            "sync executed"
        );
        Ok(result)
    }

    fn apply(&self, action: SyncAction, path: &Path, skill: Option<&Skill>) -> Result<()> {
        match action {
            SyncAction::Deleted => {
                remove_file_pruning(path, &skills_dir(&self.destination.root))
            }
            SyncAction::Created | SyncAction::Updated | SyncAction::Merged => {
                let skill = skill.ok_or_else(|| {
                    SkillSyncError::ValidationFailed(format!("nothing to write for {}", path.display()))
                })?;
                let text = match read_optional(path)? {
                    Some(existing) if action != SyncAction::Created => skill.emit_over(&existing)?,
                    _ => skill.emit()?,
                };
                atomic_write(path, text.as_bytes())
            }
            SyncAction::Skipped | SyncAction::Conflict | SyncAction::Failed => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Platform, Scope};
    use crate::sync::planner::plan;
    use std::fs;

    fn skill(name: &str, body: &str) -> Skill {
        Skill::new(name, Platform::ClaudeCode, Scope::User).with_content(body)
    }

    fn target_skill(dest: &Destination, name: &str, body: &str) -> Skill {
        let path = dest.path_for(name);
        let s = Skill::new(name, dest.platform, dest.scope)
            .with_content(body)
            .with_path(&path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, s.emit().unwrap()).unwrap();
        s
    }

    #[test]
    fn writes_created_and_updated_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, tmp.path().join(".cursor"));
        let existing = target_skill(&dest, "beta", "old\n");

        let plan = plan(
            &[skill("alpha", "A\n"), skill("beta", "new\n")],
            &[existing],
            Strategy::Overwrite,
            false,
            &dest,
        );
        let result = Executor::new(&dest).execute(plan).unwrap();
        assert_eq!(result.count(SyncAction::Created), 1);
        assert_eq!(result.count(SyncAction::Updated), 1);
        assert_eq!(
            fs::read_to_string(dest.path_for("alpha")).unwrap(),
            "---\nname: alpha\n---\nA\n"
        );
        assert_eq!(
            fs::read_to_string(dest.path_for("beta")).unwrap(),
            "---\nname: beta\n---\nnew\n"
        );
        assert!(result.backup_id.is_none());
    }

    #[test]
    fn in_place_update_keeps_rule_frontmatter_text() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".cursor");
        let rule = root.join("rules/ts.mdc");
        fs::create_dir_all(rule.parent().unwrap()).unwrap();
        fs::write(
            &rule,
            "---\ndescription: TS rules\nglobs: *.ts\nalwaysApply: false\n---\nold\n",
        )
        .unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, &root);
        let target = crate::parser::cursor::parse(&root, Scope::User).unwrap().skills;

        let source = skill("ts", "new\n")
            .with_description("TS rules")
            .with_metadata("globs", "*.ts")
            .with_metadata("alwaysApply", false);
        let plan = plan(&[source], &target, Strategy::Overwrite, false, &dest);
        let result = Executor::new(&dest).execute(plan).unwrap();

        assert_eq!(result.count(SyncAction::Updated), 1);
        assert_eq!(
            fs::read_to_string(&rule).unwrap(),
            "---\ndescription: TS rules\nglobs: *.ts\nalwaysApply: false\n---\nnew\n"
        );
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, tmp.path().join(".cursor"));
        let plan = plan(&[skill("alpha", "A\n")], &[], Strategy::Overwrite, false, &dest);
        let result = Executor::new(&dest).dry_run(true).execute(plan).unwrap();
        assert_eq!(result.count(SyncAction::Created), 1);
        assert_eq!(result.changed(), 0);
        assert!(!tmp.path().join(".cursor").exists());
    }

    #[test]
    fn delete_prunes_empty_skill_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(Platform::Codex, Scope::User, tmp.path().join(".codex"));
        let stale = target_skill(&dest, "stale", "x\n");
        let plan = plan(&[], &[stale], Strategy::Overwrite, true, &dest);
        let result = Executor::new(&dest).execute(plan).unwrap();
        assert_eq!(result.count(SyncAction::Deleted), 1);
        assert!(!tmp.path().join(".codex/skills/stale").exists());
        assert!(tmp.path().join(".codex/skills").is_dir());
    }

    #[test]
    fn cancelled_items_fail_and_are_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, tmp.path().join(".cursor"));
        let plan = plan(&[skill("alpha", "A\n")], &[], Strategy::Overwrite, false, &dest);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = Executor::new(&dest)
            .with_cancel(cancel)
            .execute(plan)
            .unwrap();
        assert!(result.has_failures());
        assert_eq!(result.skills[0].message, "cancelled");
        assert!(!dest.path_for("alpha").exists());
        assert!(matches!(
            result.into_result(),
            Err(SkillSyncError::SyncFailed { failed: 1, total: 1 })
        ));
    }

    #[test]
    fn cancel_between_writes_keeps_completed_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, tmp.path().join(".cursor"));
        let source = [skill("alpha", "A\n"), skill("beta", "B\n"), skill("gamma", "C\n")];
        let plan = plan(&source, &[], Strategy::Overwrite, false, &dest);
        let cancel = CancelFlag::new();
        let trip = cancel.clone();

        let result = Executor::new(&dest)
            .with_cancel(cancel)
            .execute_observed(plan, |settled| {
                if settled.name == "alpha" {
                    trip.cancel();
                }
            })
            .unwrap();

        let actions: Vec<SyncAction> = result.skills.iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![SyncAction::Created, SyncAction::Failed, SyncAction::Failed]
        );
        assert!(dest.path_for("alpha").exists());
        assert!(!dest.path_for("beta").exists());
        assert!(!dest.path_for("gamma").exists());
        assert_eq!(result.skills[2].message, "cancelled");
    }

    #[test]
    fn backup_taken_before_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, tmp.path().join(".cursor"));
        let existing = target_skill(&dest, "alpha", "v1\n");
        let store = BackupStore::new(tmp.path().join("backups"));
        let plan = plan(&[skill("alpha", "v2\n")], &[existing], Strategy::Overwrite, false, &dest);

        let result = Executor::new(&dest).with_backup(&store).execute(plan).unwrap();
        let id = result.backup_id.expect("backup id");
        let record = store.get(&id).unwrap();
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.metadata.source_path, dest.path_for("alpha").parent().unwrap());
    }

    #[test]
    fn write_failure_is_recorded_per_item() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the skills directory should be.
        let root = tmp.path().join(".cursor");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("skills"), "not a dir").unwrap();
        let dest = Destination::new(Platform::Cursor, Scope::User, &root);
        let plan = plan(
            &[skill("alpha", "A\n"), skill("beta", "B\n")],
            &[],
            Strategy::Overwrite,
            false,
            &dest,
        );
        let result = Executor::new(&dest).execute(plan).unwrap();
        assert_eq!(result.count(SyncAction::Failed), 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.skills[0].error.is_some());
    }
}
