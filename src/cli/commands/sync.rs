//! skillsync sync - copy skills from one platform to another

use std::io::IsTerminal;

use clap::Args;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::colors::{ColorSupport, SyncStyles, format_action, styled};
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok, robot_partial};
use crate::cli::resolver::{TerminalResolver, confirm};
use crate::diff::render_unified;
use crate::error::Result;
use crate::sync::{
    Strategy, SyncAction, SyncEngine, SyncOptions, SyncResult, SyncSpec, validate_endpoints,
};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source: <platform>[:<scope>[,<scope>...]]
    pub source: String,

    /// Target: <platform>[:<scope>]
    pub target: String,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Remove target skills that are missing from the source
    #[arg(long)]
    pub delete: bool,

    /// overwrite, skip, newer, merge, three-way or interactive
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,

    /// Do not snapshot target files before changing them
    #[arg(long)]
    pub skip_backup: bool,

    /// Skip pre-flight checks (missing source, duplicates, aggregate input)
    #[arg(long)]
    pub skip_validation: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(ctx: &AppContext, args: &SyncArgs) -> Result<()> {
    let source: SyncSpec = args.source.parse()?;
    let target: SyncSpec = args.target.parse()?;
    let scope = validate_endpoints(&source, &target)?;

    let options = SyncOptions {
        strategy: args.strategy.unwrap_or(ctx.config.sync.strategy),
        dry_run: args.dry_run,
        delete: args.delete,
        backup: ctx.config.sync.backup && !args.skip_backup,
        validate: !args.skip_validation,
    };
    debug!(?options, %source, %target, "sync requested");

    let destination = ctx.destination(target.platform, scope);
    let mut engine = SyncEngine::new(ctx.source_parser(&source), destination, options.clone())
        .with_cancel(ctx.cancel.clone());
    if options.backup {
        engine = engine.with_backup_store(ctx.backup_store());
        if let Some(cleanup) = ctx.config.backup.auto_cleanup_options()? {
            engine = engine.with_auto_cleanup(cleanup);
        }
    }

    let mut prepared = engine.prepare()?;

    let interactive = !ctx.is_robot() && std::io::stdin().is_terminal();
    if options.strategy == Strategy::Interactive && interactive {
        prepared
            .plan
            .resolve_conflicts(&mut TerminalResolver::stdio(ctx.colors));
    }

    let changes = prepared.plan.mutation_count();
    if !options.dry_run && !args.yes && changes > 0 && !ctx.is_robot() {
        let question = format!(
            "Apply {changes} change(s) to {}:{scope}?",
            target.platform
        );
        if !confirm(&question)? {
            println!("Aborted; nothing was written.");
            return Ok(());
        }
    }

    let result = engine.execute(prepared)?;
    let title = format!("Sync {source} -> {}:{scope}", target.platform);
    if ctx.is_robot() {
        emit_robot(&result)?;
    } else {
        emit_human(render(&title, &result, ctx.colors));
    }
    result.into_result().map(|_| ())
}

fn emit_robot(result: &SyncResult) -> Result<()> {
    let failed = result.count(SyncAction::Failed);
    let response = if failed > 0 {
        robot_partial(result, result.skills.len() - failed, failed)
    } else {
        robot_ok(result)
    };
    emit_json(&response.with_warnings(&result.warnings))
}

fn render(title: &str, result: &SyncResult, colors: ColorSupport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    if result.dry_run {
        layout.title(&format!("{title} (dry run)"));
    } else {
        layout.title(title);
    }

    if result.skills.is_empty() {
        layout.push_line("No skills found on either side.");
    }
    for skill in &result.skills {
        let name = styled(&skill.name, |s| SyncStyles::skill_name(s), colors);
        let message = styled(&skill.message, |s| SyncStyles::muted(s), colors);
        layout.push_line(format!(
            "{} {name}  {message}",
            format_action(skill.action, colors)
        ));
        if skill.action.mutates() {
            let path = skill.target_path.display().to_string();
            layout.push_line(format!(
                "         {}",
                styled(&path, |s| SyncStyles::path(s), colors)
            ));
        }
        if let Some(error) = &skill.error {
            layout.push_line(format!(
                "         {}",
                styled(error, |s| SyncStyles::error(s), colors)
            ));
        }
        if skill.action == SyncAction::Conflict {
            if let Some(conflict) = &skill.conflict {
                for line in render_unified(&conflict.hunks).lines() {
                    layout.push_line(format!("         {line}"));
                }
            }
        }
    }

    layout.blank();
    layout.section("Summary");
    for action in [
        SyncAction::Created,
        SyncAction::Updated,
        SyncAction::Merged,
        SyncAction::Deleted,
        SyncAction::Skipped,
        SyncAction::Conflict,
        SyncAction::Failed,
    ] {
        let count = result.count(action);
        if count > 0 {
            layout.kv(action.as_str(), &count.to_string());
        }
    }
    layout.kv("strategy", result.strategy.as_str());
    if let Some(id) = &result.backup_id {
        layout.kv("backup", id);
    }
    layout.warnings(&result.warnings);
    layout
}
