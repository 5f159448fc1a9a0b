//! Path validation for paths built from untrusted text.
//!
//! Skill names become directory and file names when a skill is written, and
//! backup indexes carry relative paths that are joined back onto a restore
//! root. Both go through this module so that neither can step outside the
//! directory they are meant to land in.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SkillSyncError};

/// Errors specific to path policy violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPolicyViolation {
    /// Path contains traversal sequences (.. or similar)
    TraversalAttempt,
    /// Path component contains invalid characters
    InvalidComponent { component: String, reason: String },
    /// Path escapes the allowed root directory
    EscapesRoot { path: PathBuf, root: PathBuf },
}

impl std::fmt::Display for PathPolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TraversalAttempt => write!(f, "path contains traversal sequences"),
            Self::InvalidComponent { component, reason } => {
                write!(f, "invalid path component {component:?}: {reason}")
            }
            Self::EscapesRoot { path, root } => {
                write!(f, "path {path:?} escapes root {root:?}")
            }
        }
    }
}

impl std::error::Error for PathPolicyViolation {}

impl From<PathPolicyViolation> for SkillSyncError {
    fn from(violation: PathPolicyViolation) -> Self {
        Self::ValidationFailed(violation.to_string())
    }
}

/// Validate a single path component (filename or directory name).
///
/// Rejects empty strings, `.` and `..`, directory separators and null bytes.
///
/// ```rust
/// use skillsync::security::path_policy::validate_path_component;
///
/// assert!(validate_path_component("my-skill").is_ok());
/// assert!(validate_path_component("..").is_err());
/// assert!(validate_path_component("foo/bar").is_err());
/// ```
pub fn validate_path_component(component: &str) -> std::result::Result<(), PathPolicyViolation> {
    let invalid = |reason: &str| PathPolicyViolation::InvalidComponent {
        component: component.to_string(),
        reason: reason.to_string(),
    };

    if component.is_empty() {
        return Err(invalid("empty component"));
    }
    if component.contains('\0') {
        return Err(invalid("contains null byte"));
    }
    if component == ".." || component == "." {
        return Err(PathPolicyViolation::TraversalAttempt);
    }
    if component.contains('/') || component.contains('\\') {
        return Err(invalid("contains directory separator"));
    }
    Ok(())
}

/// Join a relative path read from untrusted input onto `root`.
///
/// Absolute paths and `..` components are refused; `.` components are
/// dropped.
pub fn safe_join(root: &Path, relative: &Path) -> Result<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::ParentDir => return Err(PathPolicyViolation::TraversalAttempt.into()),
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathPolicyViolation::InvalidComponent {
                    component: relative.display().to_string(),
                    reason: "must be a relative path".to_string(),
                }
                .into());
            }
            Component::CurDir => {}
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                validate_path_component(&name)?;
                joined.push(name.as_ref());
            }
        }
    }
    if joined == root {
        return Err(PathPolicyViolation::InvalidComponent {
            component: relative.display().to_string(),
            reason: "empty relative path".to_string(),
        }
        .into());
    }
    Ok(joined)
}

/// Normalize a path by removing `.` and resolving `..` lexically.
///
/// Does not touch the filesystem.
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use skillsync::security::path_policy::normalize_path;
///
/// assert_eq!(normalize_path(Path::new("/foo/./bar/../baz")), PathBuf::from("/foo/baz"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => match normalized.components().next_back() {
                None | Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => {
                    normalized.pop();
                }
            },
            Component::CurDir => {}
            _ => normalized.push(component),
        }
    }
    normalized
}

/// Lexical containment check on normalized paths; symlinks are not resolved.
#[must_use]
pub fn is_under_root(path: &Path, root: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(root))
}
