//! Canonical in-memory skill representation.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::frontmatter;
use super::platform::Platform;
use super::scope::Scope;
use crate::diff::metadata_equal;
use crate::error::{Result, SkillSyncError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    #[default]
    Skill,
    /// A slash-command style prompt
    Prompt,
}

impl SkillType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skill" => Ok(Self::Skill),
            "prompt" | "command" => Ok(Self::Prompt),
            other => Err(format!("unknown type '{other}' (expected skill or prompt)")),
        }
    }
}

/// Where a skill was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillOrigin {
    /// A standalone skill or command file
    #[default]
    File,
    /// A section of an aggregate file (Codex `config.toml` / `AGENTS.md`)
    Aggregate,
}

/// The unit of synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Markdown body, frontmatter excluded, trailing newline normalized.
    pub content: String,
    /// Remaining frontmatter keys in file order.
    #[serde(default)]
    pub metadata: Mapping,
    pub platform: Platform,
    pub scope: Scope,
    #[serde(rename = "type", default)]
    pub skill_type: SkillType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub origin: SkillOrigin,
}

impl Skill {
    #[must_use]
    pub fn new(name: impl Into<String>, platform: Platform, scope: Scope) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            content: String::new(),
            metadata: Mapping::new(),
            platform,
            scope,
            skill_type: SkillType::Skill,
            trigger: None,
            path: PathBuf::new(),
            mod_time: None,
            origin: SkillOrigin::File,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl AsRef<str>) -> Self {
        self.content = normalize_content(content.as_ref());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(Value::String(key.into()), value.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_mod_time(mut self, mod_time: DateTime<Utc>) -> Self {
        self.mod_time = Some(mod_time);
        self
    }

    #[must_use]
    pub fn as_prompt(mut self, trigger: Option<String>) -> Self {
        self.skill_type = SkillType::Prompt;
        self.trigger = trigger;
        self
    }

    /// Look up a metadata value by key.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Build the frontmatter mapping in canonical key order.
    #[must_use]
    pub fn frontmatter(&self) -> Mapping {
        let mut map = Mapping::new();
        map.insert(Value::from("name"), Value::from(self.name.clone()));
        if !self.description.is_empty() {
            map.insert(
                Value::from("description"),
                Value::from(self.description.clone()),
            );
        }
        if self.skill_type == SkillType::Prompt {
            map.insert(Value::from("type"), Value::from(self.skill_type.as_str()));
        }
        if let Some(trigger) = &self.trigger {
            map.insert(Value::from("trigger"), Value::from(trigger.clone()));
        }
        for (key, value) in &self.metadata {
            map.insert(key.clone(), value.clone());
        }
        map
    }

    /// Render the skill as a canonical Markdown file.
    pub fn emit(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.frontmatter())
            .map_err(|err| SkillSyncError::Serialization(format!("emit {}: {err}", self.name)))?;
        Ok(frontmatter::render(&yaml, &self.content))
    }

    /// Render the skill as a replacement for the file text `existing`.
    ///
    /// When the existing frontmatter already carries this skill's header
    /// (name, description, type, trigger and metadata), its text is kept
    /// as written and only the body is replaced. Otherwise the skill is
    /// emitted canonically.
    pub fn emit_over(&self, existing: &str) -> Result<String> {
        let Ok((Some(yaml), _)) = frontmatter::split(existing) else {
            return self.emit();
        };
        let Ok(doc) = frontmatter::parse_with(existing, &self.path, true) else {
            return self.emit();
        };
        let same_header = doc.name.as_deref().is_none_or(|name| name.trim() == self.name)
            && doc.description.unwrap_or_default() == self.description
            && doc.skill_type.unwrap_or_default() == self.skill_type
            && doc.trigger == self.trigger
            && metadata_equal(&doc.metadata, &self.metadata);
        if same_header {
            Ok(frontmatter::render(yaml, &self.content))
        } else {
            self.emit()
        }
    }

    /// Copy of this skill re-homed onto another platform/scope/path.
    #[must_use]
    pub fn retarget(&self, platform: Platform, scope: Scope, path: PathBuf) -> Self {
        let mut skill = self.clone();
        skill.platform = platform;
        skill.scope = scope;
        skill.path = path;
        skill.origin = SkillOrigin::File;
        skill
    }
}

/// Collapse trailing newlines to exactly one; an empty body stays empty.
#[must_use]
pub fn normalize_content(content: &str) -> String {
    let trimmed = content.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

/// A per-file problem that skipped one skill without aborting the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub path: PathBuf,
    pub message: String,
}

impl ParseWarning {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<&SkillSyncError> for ParseWarning {
    fn from(err: &SkillSyncError) -> Self {
        let path = match err {
            SkillSyncError::MalformedFrontmatter { path, .. }
            | SkillSyncError::PathNotFound(path)
            | SkillSyncError::PermissionDenied(path) => path.clone(),
            _ => PathBuf::new(),
        };
        Self {
            path,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
