//! Codex layout.
//!
//! The canonical form is one directory per skill, `<root>/skills/<name>/SKILL.md`.
//! Two aggregate files are also read, never written:
//!
//! - `<root>/config.toml`: one `[skills.<name>]` table per skill with
//!   `description` and `instructions`; other keys become metadata.
//! - `<root>/AGENTS.md`: each `## Heading` section is a skill named after
//!   the slugified heading.
//!
//! A directory skill shadows an aggregate skill with the same name.

use std::fs;
use std::io;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use super::{ParseReport, parse_skill_dirs};
use crate::core::{Platform, Scope, Skill, SkillOrigin, skills_dir, slugify, validate_name};
use crate::error::{Result, SkillSyncError};
use crate::utils::mod_time;

pub const CONFIG_FILE: &str = "config.toml";
pub const AGENTS_FILE: &str = "AGENTS.md";

pub fn parse(root: &Path, scope: Scope) -> Result<ParseReport> {
    let mut report = ParseReport::default();
    parse_skill_dirs(&skills_dir(root), Platform::Codex, scope, &mut report)?;

    let mut aggregate = ParseReport::default();
    let config = root.join(CONFIG_FILE);
    if let Some(text) = read_aggregate(&config)? {
        match parse_config_toml(&text, &config, scope) {
            Ok(skills) => skills.into_iter().for_each(|skill| aggregate.push(skill)),
            Err(err) => aggregate.record(err)?,
        }
    }
    let agents = root.join(AGENTS_FILE);
    if let Some(text) = read_aggregate(&agents)? {
        for skill in parse_agents_md(&text, &agents, scope) {
            aggregate.push(skill);
        }
    }

    for skill in aggregate.skills {
        let name = skill.name.clone();
        if !report.push_unless_present(skill) {
            trace!(%name, "aggregate skill shadowed by skill directory");
        }
    }
    report.warnings.extend(aggregate.warnings);
    report.duplicates.extend(aggregate.duplicates);

    debug!(
        root = %root.display(),
        %scope,
        skills = report.skills.len(),
        "parsed codex root"
    );
    Ok(report)
}

fn read_aggregate(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SkillSyncError::from_io(err, path)),
    }
}

/// Skills declared as `[skills.<name>]` tables.
pub fn parse_config_toml(text: &str, path: &Path, scope: Scope) -> Result<Vec<Skill>> {
    let malformed = |reason: String| SkillSyncError::MalformedFrontmatter {
        path: path.to_path_buf(),
        reason,
    };
    let table: toml::Table = toml::from_str(text).map_err(|err| malformed(err.to_string()))?;
    let Some(skills) = table.get("skills") else {
        return Ok(Vec::new());
    };
    let Some(skills) = skills.as_table() else {
        return Err(malformed("'skills' must be a table".to_string()));
    };

    let modified = mod_time(path);
    let mut out = Vec::new();
    for (name, entry) in skills {
        let Some(entry) = entry.as_table() else {
            return Err(malformed(format!("'skills.{name}' must be a table")));
        };
        validate_name(name).map_err(|err| malformed(err.to_string()))?;

        let mut skill = Skill::new(name.clone(), Platform::Codex, scope).with_path(path);
        skill.origin = SkillOrigin::Aggregate;
        skill.mod_time = modified;
        for (key, value) in entry {
            match (key.as_str(), value) {
                ("description", toml::Value::String(text)) => skill.description.clone_from(text),
                ("instructions", toml::Value::String(text)) => {
                    skill.content = crate::core::normalize_content(text);
                }
                _ => {
                    skill
                        .metadata
                        .insert(Value::String(key.clone()), toml_to_yaml(value));
                }
            }
        }
        out.push(skill);
    }
    Ok(out)
}

/// Skills from the `## ` sections of an `AGENTS.md` file.
///
/// Text before the first section is ignored, as are headings inside fenced
/// code blocks.
#[must_use]
pub fn parse_agents_md(text: &str, path: &Path, scope: Scope) -> Vec<Skill> {
    let modified = mod_time(path);
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut in_fence = false;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some(heading) = line.strip_prefix("## ") {
                sections.push((heading.trim().to_string(), String::new()));
                continue;
            }
        }
        if let Some((_, body)) = sections.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }

    sections
        .into_iter()
        .filter_map(|(heading, body)| {
            let Some(name) = slugify(&heading) else {
                debug!(%heading, "AGENTS.md heading has no usable name");
                return None;
            };
            let mut skill = Skill::new(name, Platform::Codex, scope)
                .with_description(heading)
                .with_content(body.trim_start_matches('\n'))
                .with_path(path);
            skill.origin = SkillOrigin::Aggregate;
            skill.mod_time = modified;
            Some(skill)
        })
        .collect()
}

fn toml_to_yaml(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => {
            let mut map = Mapping::new();
            for (key, value) in table {
                map.insert(Value::String(key.clone()), toml_to_yaml(value));
            }
            Value::Mapping(map)
        }
    }
}
