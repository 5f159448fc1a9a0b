//! skillsync diff - show what a sync would change, hunk by hunk

use std::collections::BTreeSet;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::colors::{ColorSupport, SyncStyles, styled};
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::diff::{LineKind, render_unified};
use crate::error::Result;
use crate::parser::PlatformParser;
use crate::sync::{Conflict, SyncSpec, detect, validate_endpoints};

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Source: <platform>[:<scope>[,<scope>...]]
    pub source: String,

    /// Target: <platform>[:<scope>]
    pub target: String,

    /// Only compare this skill
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Serialize, Default)]
struct DiffOutput {
    differing: Vec<Conflict>,
    identical: Vec<String>,
    only_in_source: Vec<String>,
    only_in_target: Vec<String>,
}

pub fn run(ctx: &AppContext, args: &DiffArgs) -> Result<()> {
    let source: SyncSpec = args.source.parse()?;
    let target: SyncSpec = args.target.parse()?;
    let scope = validate_endpoints(&source, &target)?;

    let source_report = ctx.source_parser(&source).parse()?;
    let destination = ctx.destination(target.platform, scope);
    let target_report =
        PlatformParser::new(destination.platform, &destination.root, destination.scope).parse()?;

    let wanted = |name: &str| args.name.as_deref().is_none_or(|only| only == name);
    let source_names: BTreeSet<&str> = source_report
        .skills
        .iter()
        .map(|skill| skill.name.as_str())
        .filter(|name| wanted(*name))
        .collect();
    let target_names: BTreeSet<&str> = target_report
        .skills
        .iter()
        .map(|skill| skill.name.as_str())
        .filter(|name| wanted(*name))
        .collect();

    let mut output = DiffOutput {
        only_in_source: source_names
            .difference(&target_names)
            .map(ToString::to_string)
            .collect(),
        only_in_target: target_names
            .difference(&source_names)
            .map(ToString::to_string)
            .collect(),
        ..DiffOutput::default()
    };
    for src in source_report.skills.iter().filter(|s| wanted(s.name.as_str())) {
        let Some(tgt) = target_report.skills.iter().find(|t| t.name == src.name) else {
            continue;
        };
        let conflict = detect(src, tgt);
        if conflict.is_identical() {
            output.identical.push(conflict.name);
        } else {
            output.differing.push(conflict);
        }
    }

    let mut warnings = source_report.warnings;
    warnings.extend(target_report.warnings);

    if ctx.is_robot() {
        return emit_json(&robot_ok(&output).with_warnings(&warnings));
    }
    let mut layout = render(&output, ctx.colors);
    layout.warnings(&warnings);
    emit_human(layout);
    Ok(())
}

fn render(output: &DiffOutput, colors: ColorSupport) -> HumanLayout {
    let mut layout = HumanLayout::new();
    if output.differing.is_empty() {
        layout.push_line("No differences.");
    }
    for conflict in &output.differing {
        let header = format!("=== {} ({})", conflict.name, conflict.kind);
        layout.push_line(styled(&header, |s| SyncStyles::skill_name(s), colors));
        if conflict.kind.metadata_differs() {
            layout.push_line(styled("metadata differs", |s| SyncStyles::warning(s), colors));
        }
        for line in render_unified(&conflict.hunks).lines() {
            layout.push_line(colorize(line, colors));
        }
        layout.blank();
    }
    if !output.only_in_source.is_empty() {
        layout.kv("source only", &output.only_in_source.join(", "));
    }
    if !output.only_in_target.is_empty() {
        layout.kv("target only", &output.only_in_target.join(", "));
    }
    if !output.identical.is_empty() {
        layout.kv("identical", &output.identical.len().to_string());
    }
    layout
}

fn colorize(line: &str, colors: ColorSupport) -> String {
    if line.starts_with("@@") {
        styled(line, |s| SyncStyles::hunk_header(s), colors)
    } else if line.starts_with('+') {
        styled(line, |s| SyncStyles::diff_line(s, LineKind::Added), colors)
    } else if line.starts_with('-') {
        styled(line, |s| SyncStyles::diff_line(s, LineKind::Removed), colors)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Platform, Scope, Skill};

    #[test]
    fn render_shows_hunks_and_totals() {
        let source = Skill::new("alpha", Platform::ClaudeCode, Scope::User)
            .with_content("line1\nSRC\nline3\n");
        let target = Skill::new("alpha", Platform::Cursor, Scope::User)
            .with_content("line1\nTGT\nline3\n");
        let output = DiffOutput {
            differing: vec![detect(&source, &target)],
            only_in_source: vec!["beta".to_string()],
            ..DiffOutput::default()
        };
        console::set_colors_enabled(false);
        let text = render(&output, ColorSupport::None).build();
        assert!(text.contains("=== alpha"));
        assert!(text.contains("@@ -2,1 +2,1 @@"));
        assert!(text.contains("-TGT"));
        assert!(text.contains("+SRC"));
        assert!(text.contains("beta"));
    }

    #[test]
    fn empty_diff_message() {
        let text = render(&DiffOutput::default(), ColorSupport::None).build();
        assert!(text.contains("No differences."));
    }
}
