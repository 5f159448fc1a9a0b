//! Platform parsers and the tiered parser.
//!
//! Each platform has one parse function that reads a single tier root and
//! returns canonical [`Skill`]s. The [`TieredParser`] composes those per-tier
//! reads and applies scope precedence.

pub mod claude;
pub mod codex;
pub mod cursor;
pub mod tiered;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{ParseWarning, Platform, Scope, Skill, SkillType, frontmatter, validate_name};
use crate::error::{Result, SkillSyncError};
use crate::utils::mod_time;

pub use tiered::{ScopedPath, TieredParser, TieredReport};

/// Reads one tier root of a platform.
pub type ParseFn = fn(&Path, Scope) -> Result<ParseReport>;

/// Two skills with the same name inside one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub name: String,
    pub scope: Scope,
    /// The entry that was kept
    pub first: PathBuf,
    pub second: PathBuf,
}

impl Duplicate {
    #[must_use]
    pub fn to_error(&self) -> SkillSyncError {
        SkillSyncError::DuplicateName {
            name: self.name.clone(),
            scope: self.scope.to_string(),
            first: self.first.clone(),
            second: self.second.clone(),
        }
    }
}

/// Output of parsing one tier.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub skills: Vec<Skill>,
    pub warnings: Vec<ParseWarning>,
    pub duplicates: Vec<Duplicate>,
    index: HashMap<String, usize>,
}

impl ParseReport {
    /// Add a skill, keeping the first one seen for each name.
    pub fn push(&mut self, skill: Skill) {
        if let Some(&existing) = self.index.get(&skill.name) {
            let first = &self.skills[existing];
            warn!(name = %skill.name, path = %skill.path.display(), "duplicate skill name");
            self.duplicates.push(Duplicate {
                name: skill.name.clone(),
                scope: skill.scope,
                first: first.path.clone(),
                second: skill.path,
            });
            return;
        }
        self.index.insert(skill.name.clone(), self.skills.len());
        self.skills.push(skill);
    }

    /// Add a skill unless one with the same name is already present.
    ///
    /// Returns whether the skill was added. Used where one artifact kind
    /// shadows another without that being a duplicate.
    pub fn push_unless_present(&mut self, skill: Skill) -> bool {
        if self.contains(&skill.name) {
            return false;
        }
        self.push(skill);
        true
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Record a per-file failure. Permission problems abort the tier.
    pub fn record(&mut self, err: SkillSyncError) -> Result<()> {
        if let SkillSyncError::PermissionDenied(_) = err {
            return Err(err);
        }
        let warning = ParseWarning::from(&err);
        warn!(path = %warning.path.display(), "{}", warning.message);
        self.warnings.push(warning);
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.warnings.is_empty()
    }
}

impl Platform {
    /// Parse function for this platform.
    #[must_use]
    pub fn parser(self) -> ParseFn {
        match self {
            Self::ClaudeCode => claude::parse,
            Self::Cursor => cursor::parse,
            Self::Codex => codex::parse,
        }
    }
}

/// A platform parser bound to a single tier root.
#[derive(Debug, Clone)]
pub struct PlatformParser {
    platform: Platform,
    root: PathBuf,
    scope: Scope,
}

impl PlatformParser {
    #[must_use]
    pub fn new(platform: Platform, root: impl Into<PathBuf>, scope: Scope) -> Self {
        Self {
            platform,
            root: root.into(),
            scope,
        }
    }

    pub fn parse(&self) -> Result<ParseReport> {
        (self.platform.parser())(&self.root, self.scope)
    }
}

/// How a file maps onto a [`Skill`] beyond its frontmatter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileKind<'a> {
    pub platform: Platform,
    pub scope: Scope,
    /// Name used when frontmatter has none
    pub fallback_name: &'a str,
    pub skill_type: SkillType,
    /// Trigger used for prompts without one in frontmatter
    pub default_trigger: Option<&'a str>,
    pub lenient: bool,
}

/// Read one skill file.
pub(crate) fn read_skill_file(path: &Path, kind: FileKind<'_>) -> Result<Skill> {
    let text = fs::read_to_string(path).map_err(|err| SkillSyncError::from_io(err, path))?;
    let doc = frontmatter::parse_with(&text, path, kind.lenient)?;

    let name = doc
        .name
        .filter(|name| !name.trim().is_empty())
        .map_or_else(|| kind.fallback_name.to_string(), |name| name.trim().to_string());
    validate_name(&name)?;

    let skill_type = doc.skill_type.unwrap_or(kind.skill_type);
    let mut skill = Skill::new(name, kind.platform, kind.scope)
        .with_path(path)
        .with_content(doc.body);
    skill.description = doc.description.unwrap_or_default();
    skill.metadata = doc.metadata;
    skill.skill_type = skill_type;
    skill.trigger = doc
        .trigger
        .or_else(|| match skill_type {
            SkillType::Prompt => kind.default_trigger.map(str::to_string),
            SkillType::Skill => None,
        });
    skill.mod_time = mod_time(path);
    Ok(skill)
}

/// Sorted entries of `dir`; a missing directory yields nothing.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "directory not found, skipping");
            return Ok(Vec::new());
        }
        Err(err) => return Err(SkillSyncError::from_io(err, dir)),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| SkillSyncError::from_io(err, dir))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Parse `<skills>/<dir>/SKILL.md` entries, used by ClaudeCode and Codex.
pub(crate) fn parse_skill_dirs(
    skills: &Path,
    platform: Platform,
    scope: Scope,
    report: &mut ParseReport,
) -> Result<()> {
    for dir in sorted_entries(skills)? {
        if !dir.is_dir() {
            continue;
        }
        let file = dir.join("SKILL.md");
        if !file.is_file() {
            continue;
        }
        let fallback = file_name(&dir);
        let kind = FileKind {
            platform,
            scope,
            fallback_name: &fallback,
            skill_type: SkillType::Skill,
            default_trigger: None,
            lenient: false,
        };
        match read_skill_file(&file, kind) {
            Ok(skill) => report.push(skill),
            Err(err) => report.record(with_path(err, &file))?,
        }
    }
    Ok(())
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Full final component; directory names such as `1.2.0` keep their dots.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|found| found == ext)
}

/// Attach `path` to errors that do not carry one, so warnings point at
/// the offending file.
pub(crate) fn with_path(err: SkillSyncError, path: &Path) -> SkillSyncError {
    match err {
        SkillSyncError::InvalidName { name, reason } => SkillSyncError::MalformedFrontmatter {
            path: path.to_path_buf(),
            reason: format!("invalid skill name '{name}': {reason}"),
        },
        SkillSyncError::Io(io) => SkillSyncError::from_io(io, path),
        other => other,
    }
}
