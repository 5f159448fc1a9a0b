//! Skill name and metadata validation

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use super::skill::Skill;
use crate::error::{Result, SkillSyncError};
use crate::security::path_policy::validate_path_component;

static NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_:/-]+$").expect("valid regex"));

/// Validate a skill name.
///
/// Names may contain alphanumerics, `-`, `_`, `:` and `/`. Each
/// `/`-separated segment becomes a path component when the skill is
/// written, so empty, `.` and `..` segments are rejected.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| SkillSyncError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if !NAME_CHARS.is_match(name) {
        return Err(invalid(
            "only letters, digits, '-', '_', ':' and '/' are allowed",
        ));
    }
    for segment in name.split('/') {
        validate_path_component(segment).map_err(|violation| invalid(&violation.to_string()))?;
    }
    Ok(())
}

/// Turn free text (an `AGENTS.md` heading) into a valid skill name.
///
/// Lowercases, maps runs of other characters to a single `-` and trims
/// dashes from both ends. Returns `None` when nothing usable remains.
#[must_use]
pub fn slugify(text: &str) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() { None } else { Some(slug) }
}

/// A validation warning (not an error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

/// Check reserved metadata keys for the value shapes platforms expect.
#[must_use]
pub fn validate_metadata(skill: &Skill) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut expect = |key: &str, ok: fn(&Value) -> bool, shape: &str| {
        if let Some(value) = skill.metadata_value(key) {
            if !ok(value) {
                warnings.push(ValidationWarning {
                    field: key.to_string(),
                    message: format!("'{key}' should be {shape}"),
                });
            }
        }
    };

    expect("alwaysApply", Value::is_bool, "a boolean");
    expect(
        "disable-model-invocation",
        Value::is_bool,
        "a boolean",
    );
    expect("globs", string_or_list, "a string or a list of strings");
    expect("tools", string_or_list, "a string or a list of strings");
    expect("license", Value::is_string, "a string");
    warnings
}

fn string_or_list(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Sequence(items) => items.iter().all(Value::is_string),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Platform, Scope};
    use crate::test_utils::{TestCase, run_table_tests};

    #[test]
    fn name_rules() {
        let cases = vec![
            TestCase {
                name: "plain",
                input: "alpha",
                expected: true,
            },
            TestCase {
                name: "plugin prefixed",
                input: "tools:deploy",
                expected: true,
            },
            TestCase {
                name: "nested",
                input: "team/review-pr",
                expected: true,
            },
            TestCase {
                name: "empty",
                input: "",
                expected: false,
            },
            TestCase {
                name: "space",
                input: "two words",
                expected: false,
            },
            TestCase {
                name: "traversal",
                input: "../escape",
                expected: false,
            },
            TestCase {
                name: "empty segment",
                input: "a//b",
                expected: false,
            },
            TestCase {
                name: "dot",
                input: "a/./b",
                expected: false,
            },
        ];
        run_table_tests(cases, |input| validate_name(input).is_ok()).unwrap();
    }

    #[test]
    fn slugify_headings() {
        assert_eq!(slugify("Code Review").as_deref(), Some("code-review"));
        assert_eq!(slugify("  Testing: unit & e2e!  ").as_deref(), Some("testing-unit-e2e"));
        assert_eq!(slugify("snake_case ok").as_deref(), Some("snake_case-ok"));
        assert_eq!(slugify("!!!"), None);
    }

    #[test]
    fn metadata_shapes() {
        let skill = Skill::new("r", Platform::Cursor, Scope::Repo)
            .with_metadata("alwaysApply", "yes")
            .with_metadata("globs", "*.rs");
        let warnings = validate_metadata(&skill);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "alwaysApply");
    }
}
