//! skillsync backup - list, restore, verify and clean up backups

use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::app::AppContext;
use crate::backup::{BackupMetadata, CleanupOptions, ListFilter, VerifyReport, parse_duration};
use crate::cli::colors::{ColorSupport, SyncStyles, format_status, styled};
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::cli::resolver::confirm;
use crate::core::Platform;
use crate::error::{Result, SkillSyncError};
use crate::utils::{format_age, format_size};

#[derive(Args, Debug)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    /// List backups, newest first
    List(ListArgs),

    /// Copy a backup's files back into place
    Restore(RestoreArgs),

    /// Recompute and compare checksums
    Verify(VerifyArgs),

    /// Delete old backups
    Cleanup(CleanupArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Only backups newer than this (e.g. 7d, 12h)
    #[arg(long, value_name = "DURATION")]
    pub since: Option<String>,

    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    pub id: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Delete backups older than this (e.g. 30d, 2w)
    #[arg(long, value_name = "DURATION")]
    pub older_than: Option<String>,

    /// Keep this many of the newest backups per platform
    #[arg(long, value_name = "N")]
    pub keep_latest: Option<usize>,

    #[arg(long)]
    pub platform: Option<Platform>,

    /// Report what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(ctx: &AppContext, args: &BackupArgs) -> Result<()> {
    match &args.command {
        BackupCommand::List(args) => list(ctx, args),
        BackupCommand::Restore(args) => restore(ctx, args),
        BackupCommand::Verify(args) => verify(ctx, args),
        BackupCommand::Cleanup(args) => cleanup(ctx, args),
    }
}

fn list(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let since = match &args.since {
        Some(raw) => {
            let age = chrono::TimeDelta::from_std(parse_duration(raw)?)
                .map_err(|_| SkillSyncError::InvalidDuration(raw.clone()))?;
            Some(Utc::now() - age)
        }
        None => None,
    };
    let backups = ctx.backup_store().list(&ListFilter {
        platform: args.platform,
        since,
        limit: args.limit,
    })?;

    if ctx.is_robot() {
        return emit_json(&robot_ok(&backups));
    }
    emit_human(render_list(&backups, ctx.colors));
    Ok(())
}

fn render_list(backups: &[BackupMetadata], colors: ColorSupport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    if backups.is_empty() {
        layout.push_line("No backups.");
        return layout;
    }
    let now = Utc::now();
    for backup in backups {
        layout.push_line(format!(
            "{}  {:<10} {:>9}  {:<8} {}",
            styled(&backup.id, |s| SyncStyles::skill_name(s), colors),
            backup.platform.as_str(),
            format_size(backup.size),
            format_age(backup.created_at, now),
            styled(
                &backup.source_path.display().to_string(),
                |s| SyncStyles::muted(s),
                colors
            ),
        ));
    }
    layout
}

#[derive(Serialize)]
struct RestoreOutput {
    id: String,
    restored: Vec<std::path::PathBuf>,
}

fn restore(ctx: &AppContext, args: &RestoreArgs) -> Result<()> {
    let store = ctx.backup_store();
    if !args.yes && !ctx.is_robot() {
        let record = store.get(&args.id)?;
        let question = format!(
            "Restore {} file(s) into {}?",
            record.files.len(),
            record.metadata.source_path.display()
        );
        if !confirm(&question)? {
            println!("Aborted; nothing was restored.");
            return Ok(());
        }
    }

    let restored = store.restore(&args.id)?;
    if ctx.is_robot() {
        return emit_json(&robot_ok(RestoreOutput {
            id: args.id.clone(),
            restored,
        }));
    }
    let mut layout = HumanLayout::new();
    layout.title(&format!("Restored {}", args.id));
    for path in &restored {
        layout.bullet(&path.display().to_string());
    }
    emit_human(layout);
    Ok(())
}

fn verify(ctx: &AppContext, args: &VerifyArgs) -> Result<()> {
    let report = ctx.backup_store().verify(&args.id)?;
    if report.is_ok() && ctx.is_robot() {
        return emit_json(&robot_ok(&report));
    }
    if !ctx.is_robot() {
        emit_human(render_verify(&report, ctx.colors));
    }
    if report.is_ok() {
        return Ok(());
    }
    let reasons: Vec<String> = report
        .problems
        .iter()
        .map(|problem| format!("{}: {}", problem.relative_path.display(), problem.reason))
        .collect();
    Err(SkillSyncError::BackupCorrupt {
        id: report.id,
        reason: reasons.join("; "),
    })
}

fn render_verify(report: &VerifyReport, colors: ColorSupport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.push_line(format!(
        "{} {} ({} file(s) checked)",
        format_status(Some(report.is_ok()), colors),
        report.id,
        report.checked
    ));
    for problem in &report.problems {
        layout.bullet(&format!(
            "{}: {}",
            problem.relative_path.display(),
            problem.reason
        ));
    }
    layout
}

#[derive(Serialize)]
struct CleanupOutput {
    dry_run: bool,
    removed: Vec<String>,
}

fn cleanup(ctx: &AppContext, args: &CleanupArgs) -> Result<()> {
    let mut options = CleanupOptions {
        older_than: args.older_than.as_deref().map(parse_duration).transpose()?,
        keep_latest: args.keep_latest,
        platform: args.platform,
        dry_run: args.dry_run,
    };
    if options.is_noop() {
        options.older_than = ctx.config.backup.retention()?;
        options.keep_latest = ctx.config.backup.keep_latest;
    }
    if options.is_noop() {
        return Err(SkillSyncError::ValidationFailed(
            "nothing to clean up: pass --older-than or --keep-latest (or set backup.retention / backup.keep_latest)".to_string(),
        ));
    }

    let removed = ctx.backup_store().cleanup(&options)?;
    if ctx.is_robot() {
        return emit_json(&robot_ok(CleanupOutput {
            dry_run: args.dry_run,
            removed,
        }));
    }
    let mut layout = HumanLayout::new();
    let verb = if args.dry_run { "Would remove" } else { "Removed" };
    layout.push_line(format!("{verb} {} backup(s)", removed.len()));
    for id in &removed {
        layout.bullet(id);
    }
    emit_human(layout);
    Ok(())
}
