//! End-to-end sync: parse both sides, validate, plan, resolve, execute.

use std::fs;

use tracing::{debug, info, warn};

use super::cancel::CancelFlag;
use super::executor::{Executor, SyncResult};
use super::planner::{Destination, Plan, SyncAction, plan};
use super::resolver::ConflictResolver;
use super::strategy::Strategy;
use crate::backup::{BackupStore, CleanupOptions};
use crate::core::{ParseWarning, SkillOrigin, validate_metadata};
use crate::error::{Result, SkillSyncError};
use crate::parser::{Duplicate, PlatformParser, TieredParser};
use crate::utils::nearest_existing_ancestor;

/// Flags that shape one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub strategy: Strategy,
    pub dry_run: bool,
    pub delete: bool,
    pub backup: bool,
    pub validate: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            dry_run: false,
            delete: false,
            backup: true,
            validate: true,
        }
    }
}

/// A plan ready for confirmation and conflict resolution.
#[derive(Debug, Clone)]
pub struct PreparedSync {
    pub plan: Plan,
    pub warnings: Vec<ParseWarning>,
    pub source_count: usize,
    pub target_count: usize,
}

pub struct SyncEngine {
    source: TieredParser,
    destination: Destination,
    options: SyncOptions,
    store: Option<BackupStore>,
    auto_cleanup: Option<CleanupOptions>,
    cancel: CancelFlag,
}

impl SyncEngine {
    #[must_use]
    pub fn new(source: TieredParser, destination: Destination, options: SyncOptions) -> Self {
        Self {
            source,
            destination,
            options,
            store: None,
            auto_cleanup: None,
            cancel: CancelFlag::default(),
        }
    }

    #[must_use]
    pub fn with_backup_store(mut self, store: BackupStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Prune backups with `options` after a sync that took one.
    #[must_use]
    pub fn with_auto_cleanup(mut self, options: CleanupOptions) -> Self {
        self.auto_cleanup = Some(options);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    #[must_use]
    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Parse both sides, validate them and build the plan. Nothing is
    /// written.
    pub fn prepare(&self) -> Result<PreparedSync> {
        if self.options.validate {
            self.check_source_tiers()?;
            self.check_target_writable()?;
        }

        let source = self.source.parse()?;
        let target = PlatformParser::new(
            self.destination.platform,
            &self.destination.root,
            self.destination.scope,
        )
        .parse()?;

        let mut warnings = source.warnings;
        warnings.extend(target.warnings);

        let duplicates = source.duplicates.iter().chain(&target.duplicates);
        if self.options.validate {
            if let Some(dup) = source.duplicates.first().or(target.duplicates.first()) {
                return Err(dup.to_error());
            }
            let aggregate: Vec<&str> = source
                .skills
                .iter()
                .filter(|skill| skill.origin == SkillOrigin::Aggregate)
                .map(|skill| skill.name.as_str())
                .collect();
            if !aggregate.is_empty() {
                return Err(SkillSyncError::ValidationFailed(format!(
                    "aggregate entries cannot be synced as files: {} (use --skip-validation to write them as SKILL.md)",
                    aggregate.join(", ")
                )));
            }
        } else {
            warnings.extend(duplicates.map(duplicate_warning));
        }

        for skill in &source.skills {
            for warning in validate_metadata(skill) {
                warnings.push(ParseWarning::new(&skill.path, warning.message));
            }
        }

        let plan = plan(
            &source.skills,
            &target.skills,
            self.options.strategy,
            self.options.delete,
            &self.destination,
        );
        debug!(
            items = plan.items.len(),
            mutations = plan.mutation_count(),
            "sync planned"
        );
        Ok(PreparedSync {
            plan,
            warnings,
            source_count: source.skills.len(),
            target_count: target.skills.len(),
        })
    }

    /// Apply a prepared plan.
    pub fn execute(&self, prepared: PreparedSync) -> Result<SyncResult> {
        let mut executor = Executor::new(&self.destination)
            .dry_run(self.options.dry_run)
            .with_cancel(self.cancel.clone());
        if self.options.backup {
            if let Some(store) = &self.store {
                executor = executor.with_backup(store);
            }
        }

        let mut result = executor.execute(prepared.plan)?;
        result.warnings = prepared.warnings;

        if result.backup_id.is_some() && !result.has_failures() {
            self.run_auto_cleanup();
        }
        info!(
            strategy = %self.options.strategy,
            created = result.count(SyncAction::Created),
            updated = result.count(SyncAction::Updated),
            "sync finished"
        );
        Ok(result)
    }

    /// Prepare, resolve conflicts with `resolver`, execute.
    pub fn run(&self, resolver: &mut dyn ConflictResolver) -> Result<SyncResult> {
        let mut prepared = self.prepare()?;
        prepared.plan.resolve_conflicts(resolver);
        self.execute(prepared)
    }

    fn check_source_tiers(&self) -> Result<()> {
        let tiers = self.source.tiers();
        if tiers.iter().any(|tier| tier.path.exists()) {
            return Ok(());
        }
        let listed: Vec<String> = tiers
            .iter()
            .map(|tier| format!("{} ({})", tier.path.display(), tier.scope))
            .collect();
        Err(SkillSyncError::ValidationFailed(format!(
            "no {} source directory exists: {}",
            self.source.platform(),
            if listed.is_empty() {
                "no tiers configured".to_string()
            } else {
                listed.join(", ")
            }
        )))
    }

    fn check_target_writable(&self) -> Result<()> {
        let root = &self.destination.root;
        let Some(ancestor) = nearest_existing_ancestor(root) else {
            return Err(SkillSyncError::ValidationFailed(format!(
                "target {} has no existing parent",
                root.display()
            )));
        };
        let meta = fs::metadata(&ancestor).map_err(|err| SkillSyncError::from_io(err, &ancestor))?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(SkillSyncError::ValidationFailed(format!(
                "target {} is not writable ({} is read-only or not a directory)",
                root.display(),
                ancestor.display()
            )));
        }
        Ok(())
    }

    fn run_auto_cleanup(&self) {
        let (Some(store), Some(options)) = (&self.store, &self.auto_cleanup) else {
            return;
        };
        match store.cleanup(options) {
            Ok(removed) if !removed.is_empty() => {
                info!(removed = removed.len(), "pruned old backups");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "automatic backup cleanup failed"),
        }
    }
}

fn duplicate_warning(dup: &Duplicate) -> ParseWarning {
    ParseWarning::new(&dup.second, dup.to_error().to_string())
}
