//! Claude Code layout.
//!
//! ```text
//! <root>/commands/<stem>.md          prompt, trigger /<stem>
//! <root>/skills/<name>/SKILL.md      skill
//! ~/.claude/plugins/cache/<marketplace>/<plugin>/<version>/**
//! ```
//!
//! A skill and a command with the same name in one root resolve to the
//! skill.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use super::{
    FileKind, ParseReport, file_name, file_stem, has_extension, parse_skill_dirs, read_skill_file,
    sorted_entries, with_path,
};
use crate::core::{Platform, Scope, SkillType, skills_dir};
use crate::error::{Result, SkillSyncError};

pub fn parse(root: &Path, scope: Scope) -> Result<ParseReport> {
    if scope == Scope::Plugin {
        return parse_plugin_cache(root);
    }

    let mut report = ParseReport::default();
    parse_skill_dirs(&skills_dir(root), Platform::ClaudeCode, scope, &mut report)?;
    parse_commands(&root.join("commands"), scope, None, &mut report)?;
    debug!(
        root = %root.display(),
        %scope,
        skills = report.skills.len(),
        "parsed claude code root"
    );
    Ok(report)
}

fn parse_commands(
    dir: &Path,
    scope: Scope,
    plugin: Option<&str>,
    report: &mut ParseReport,
) -> Result<()> {
    for path in sorted_entries(dir)? {
        if !path.is_file() || !has_extension(&path, "md") {
            continue;
        }
        let stem = file_stem(&path);
        let local = match plugin {
            Some(plugin) => format!("{plugin}:{stem}"),
            None => stem,
        };
        let trigger = format!("/{local}");
        let kind = FileKind {
            platform: Platform::ClaudeCode,
            scope,
            fallback_name: &local,
            skill_type: SkillType::Prompt,
            default_trigger: Some(&trigger),
            lenient: false,
        };
        match read_skill_file(&path, kind) {
            Ok(mut command) => {
                if let Some(plugin) = plugin {
                    command.name = qualify(plugin, &command.name);
                }
                if command.skill_type == SkillType::Skill {
                    command = command.as_prompt(Some(trigger.clone()));
                }
                let name = command.name.clone();
                if !report.push_unless_present(command) {
                    trace!(%name, path = %path.display(), "command shadowed by skill");
                }
            }
            Err(err) => report.record(with_path(err, &path))?,
        }
    }
    Ok(())
}

/// Walk `<cache>/<marketplace>/<plugin>/<version>`, reading only the newest
/// version of each plugin.
fn parse_plugin_cache(cache: &Path) -> Result<ParseReport> {
    let mut report = ParseReport::default();
    for marketplace in sorted_entries(cache)? {
        if !marketplace.is_dir() {
            continue;
        }
        for plugin_dir in sorted_entries(&marketplace)? {
            if !plugin_dir.is_dir() {
                continue;
            }
            let Some(version_dir) = newest_version(&plugin_dir)? else {
                continue;
            };
            let plugin = file_name(&plugin_dir);
            debug!(%plugin, version = %version_dir.display(), "reading plugin");
            parse_plugin_version(&version_dir, &plugin, &mut report)?;
        }
    }
    Ok(report)
}

fn parse_plugin_version(dir: &Path, plugin: &str, report: &mut ParseReport) -> Result<()> {
    let mut command_dirs = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                let io = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                report.record(SkillSyncError::from_io(io, path))?;
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_dir() && entry.file_name() == "commands" {
            command_dirs.push(path.to_path_buf());
            continue;
        }
        if !entry.file_type().is_file() || entry.file_name() != "SKILL.md" {
            continue;
        }
        let fallback = path.parent().map(file_name).unwrap_or_default();
        let kind = FileKind {
            platform: Platform::ClaudeCode,
            scope: Scope::Plugin,
            fallback_name: &fallback,
            skill_type: SkillType::Skill,
            default_trigger: None,
            lenient: false,
        };
        match read_skill_file(path, kind) {
            Ok(mut skill) => {
                skill.name = qualify(plugin, &skill.name);
                report.push(skill);
            }
            Err(err) => report.record(with_path(err, path))?,
        }
    }
    for commands in command_dirs {
        parse_commands(&commands, Scope::Plugin, Some(plugin), report)?;
    }
    Ok(())
}

fn qualify(plugin: &str, name: &str) -> String {
    let prefix = format!("{plugin}:");
    if name.starts_with(&prefix) {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

fn newest_version(plugin_dir: &Path) -> Result<Option<PathBuf>> {
    let mut versions: Vec<PathBuf> = sorted_entries(plugin_dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect();
    versions.sort_by(|a, b| compare_versions(&file_name(a), &file_name(b)));
    Ok(versions.pop())
}

/// Semver ordering when both parse, semver before non-semver otherwise,
/// lexicographic as the last resort.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |raw: &str| semver::Version::parse(raw.trim_start_matches('v')).ok();
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}
