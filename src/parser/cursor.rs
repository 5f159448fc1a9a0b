//! Cursor layout: `<root>/skills/*.md`, `<root>/skills/*.mdc` and
//! `<root>/rules/*.mdc`.
//!
//! `.mdc` rule files keep their extra keys (`globs`, `alwaysApply`) in
//! metadata. Their frontmatter is read leniently.

use std::path::Path;

use tracing::debug;

use super::{FileKind, ParseReport, file_stem, has_extension, read_skill_file, sorted_entries, with_path};
use crate::core::{Platform, Scope, SkillType, skills_dir};
use crate::error::Result;

pub fn parse(root: &Path, scope: Scope) -> Result<ParseReport> {
    let mut report = ParseReport::default();
    parse_dir(&skills_dir(root), scope, &["md", "mdc"], &mut report)?;
    parse_dir(&root.join("rules"), scope, &["mdc"], &mut report)?;
    debug!(
        root = %root.display(),
        %scope,
        skills = report.skills.len(),
        "parsed cursor root"
    );
    Ok(report)
}

fn parse_dir(dir: &Path, scope: Scope, extensions: &[&str], report: &mut ParseReport) -> Result<()> {
    for path in sorted_entries(dir)? {
        if !path.is_file() || !extensions.iter().any(|ext| has_extension(&path, ext)) {
            continue;
        }
        let stem = file_stem(&path);
        let kind = FileKind {
            platform: Platform::Cursor,
            scope,
            fallback_name: &stem,
            skill_type: SkillType::Skill,
            default_trigger: None,
            lenient: has_extension(&path, "mdc"),
        };
        match read_skill_file(&path, kind) {
            Ok(skill) => report.push(skill),
            Err(err) => report.record(with_path(err, &path))?,
        }
    }
    Ok(())
}
