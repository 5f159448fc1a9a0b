//! skillsync list - show discovered skills per tier

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::colors::{ColorSupport, SyncStyles, format_scope, styled};
use crate::cli::output::{HumanLayout, emit_human, emit_json, robot_ok};
use crate::core::{Platform, Scope, Skill, SkillOrigin, SkillType};
use crate::error::Result;
use crate::parser::{ScopedPath, TieredReport};
use crate::sync::SyncSpec;
use crate::utils::truncate_string;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// <platform>[:<scope>[,<scope>...]]
    pub spec: String,

    /// Also list entries hidden by a higher-precedence tier
    #[arg(long)]
    pub shadowed: bool,
}

#[derive(Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    scope: Scope,
    #[serde(rename = "type")]
    skill_type: SkillType,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trigger: Option<&'a str>,
    origin: SkillOrigin,
    path: &'a PathBuf,
}

impl<'a> From<&'a Skill> for ListEntry<'a> {
    fn from(skill: &'a Skill) -> Self {
        Self {
            name: &skill.name,
            scope: skill.scope,
            skill_type: skill.skill_type,
            description: (!skill.description.is_empty()).then_some(skill.description.as_str()),
            trigger: skill.trigger.as_deref(),
            origin: skill.origin,
            path: &skill.path,
        }
    }
}

#[derive(Serialize)]
struct ListOutput<'a> {
    platform: Platform,
    tiers: &'a [ScopedPath],
    skills: Vec<ListEntry<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    shadowed: Vec<ListEntry<'a>>,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let spec: SyncSpec = args.spec.parse()?;
    let parser = ctx.source_parser(&spec);
    let report = parser.parse()?;

    if ctx.is_robot() {
        let output = ListOutput {
            platform: spec.platform,
            tiers: parser.tiers(),
            skills: report.skills.iter().map(ListEntry::from).collect(),
            shadowed: if args.shadowed {
                report.shadowed.iter().map(ListEntry::from).collect()
            } else {
                Vec::new()
            },
        };
        return emit_json(&robot_ok(output).with_warnings(&report.warnings));
    }

    emit_human(render(&spec, parser.tiers(), &report, args.shadowed, ctx.colors));
    Ok(())
}

fn render(
    spec: &SyncSpec,
    tiers: &[ScopedPath],
    report: &TieredReport,
    shadowed: bool,
    colors: ColorSupport,
) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&format!(
        "{} skills ({})",
        spec.platform.display_name(),
        report.skills.len()
    ));
    for tier in tiers {
        let marker = if tier.path.exists() { "" } else { " (missing)" };
        layout.kv(
            tier.scope.as_str(),
            &format!("{}{marker}", tier.path.display()),
        );
    }
    layout.blank();

    if report.skills.is_empty() {
        layout.push_line("No skills found.");
    }
    for skill in &report.skills {
        layout.push_line(entry_line(skill, colors));
    }

    if shadowed && !report.shadowed.is_empty() {
        layout.blank();
        layout.section(&format!("Shadowed ({})", report.shadowed.len()));
        for skill in &report.shadowed {
            layout.push_line(entry_line(skill, colors));
        }
    }
    layout.warnings(&report.warnings);
    layout
}

fn entry_line(skill: &Skill, colors: ColorSupport) -> String {
    let name = format!("{:<28}", truncate_string(&skill.name, 28));
    let scope = format_scope(skill.scope, colors);
    let padding = " ".repeat(8usize.saturating_sub(skill.scope.as_str().len()));
    let kind = match (&skill.trigger, skill.skill_type) {
        (Some(trigger), SkillType::Prompt) => trigger.clone(),
        (_, kind) => kind.to_string(),
    };
    let path = skill.path.display().to_string();
    format!(
        "{} {scope}{padding} {:<16} {}",
        styled(&name, |s| SyncStyles::skill_name(s), colors),
        truncate_string(&kind, 16),
        styled(&path, |s| SyncStyles::muted(s), colors),
    )
}
