//! YAML frontmatter extraction and rendering.
//!
//! A skill file optionally begins with a `---` fence, a YAML mapping and a
//! closing `---` fence. Everything after the closing fence is the body.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::skill::{SkillType, normalize_content};
use crate::error::{Result, SkillSyncError};

const FENCE: &str = "---";

/// Typed view of a parsed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub name: Option<String>,
    pub description: Option<String>,
    pub skill_type: Option<SkillType>,
    pub trigger: Option<String>,
    /// Keys that are not typed fields, in file order
    pub metadata: Mapping,
    /// Body with trailing newline normalized
    pub body: String,
    pub has_frontmatter: bool,
}

/// Split raw file text into `(frontmatter, body)`.
///
/// Returns `Ok((None, text))` when the file has no opening fence, and an
/// error when an opening fence is never closed.
pub fn split(text: &str) -> std::result::Result<(Option<&str>, &str), String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(first_line_end) = text.find('\n') else {
        if text.trim_end() == FENCE {
            return Err("unterminated frontmatter".to_string());
        }
        return Ok((None, text));
    };
    if text[..first_line_end].trim_end() != FENCE {
        return Ok((None, text));
    }

    let yaml_start = first_line_end + 1;
    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }
    Err("unterminated frontmatter".to_string())
}

/// Parse a document, failing with `MalformedFrontmatter` on invalid YAML.
pub fn parse(text: &str, path: &Path) -> Result<Document> {
    parse_with(text, path, false)
}

/// Parse a document; when `lenient` is set, YAML that does not parse is
/// re-read as flat `key: value` lines (Cursor `.mdc` rules often carry
/// unquoted globs such as `globs: *.ts`).
pub fn parse_with(text: &str, path: &Path, lenient: bool) -> Result<Document> {
    let malformed = |reason: String| SkillSyncError::MalformedFrontmatter {
        path: path.to_path_buf(),
        reason,
    };

    let (yaml, body) = split(text).map_err(malformed)?;
    let mut doc = Document {
        body: normalize_content(body),
        ..Document::default()
    };
    let Some(yaml) = yaml else {
        return Ok(doc);
    };
    doc.has_frontmatter = true;

    let mapping = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(mapping)) => mapping,
        Ok(Value::Null) => Mapping::new(),
        Ok(other) => {
            return Err(malformed(format!(
                "expected a mapping, found {}",
                value_kind(&other)
            )));
        }
        Err(err) if lenient => {
            tracing::debug!(path = %path.display(), error = %err, "falling back to lenient frontmatter");
            parse_flat(yaml).ok_or_else(|| malformed(err.to_string()))?
        }
        Err(err) => return Err(malformed(err.to_string())),
    };

    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(malformed(format!(
                "non-string key of kind {}",
                value_kind(&key)
            )));
        };
        match key.as_str() {
            "name" => doc.name = Some(scalar_string(&key, &value).map_err(malformed)?),
            "description" => {
                doc.description = Some(scalar_string(&key, &value).map_err(malformed)?);
            }
            "type" => {
                let raw = scalar_string(&key, &value).map_err(malformed)?;
                doc.skill_type = Some(raw.parse().map_err(malformed)?);
            }
            "trigger" => doc.trigger = Some(scalar_string(&key, &value).map_err(malformed)?),
            _ => {
                doc.metadata.insert(Value::String(key), value);
            }
        }
    }

    Ok(doc)
}

/// Assemble a file from serialized YAML and a body.
#[must_use]
pub fn render(yaml: &str, body: &str) -> String {
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(yaml);
    if !yaml.is_empty() && !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(body);
    out
}

fn scalar_string(key: &str, value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(format!(
            "'{key}' must be a string, found {}",
            value_kind(other)
        )),
    }
}

fn parse_flat(yaml: &str) -> Option<Mapping> {
    let mut map = Mapping::new();
    for line in yaml.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (key, value) = trimmed.split_once(':')?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        let value = value.trim();
        let value = match value {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "" => Value::Null,
            other => Value::String(other.to_string()),
        };
        map.insert(Value::String(key.to_string()), value);
    }
    Some(map)
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
