//! Error types for skillsync

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillSyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid platform '{0}' (expected claudecode, cursor or codex)")]
    InvalidPlatform(String),

    #[error("invalid scope '{0}' (expected builtin, system, admin, user, repo or plugin)")]
    InvalidScope(String),

    #[error("invalid sync spec '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("unknown strategy '{0}' (expected overwrite, skip, newer, merge, three-way or interactive)")]
    InvalidStrategy(String),

    #[error("source and target are the same: {0}")]
    SameSourceAndTarget(String),

    #[error("scope '{0}' is read-only and cannot be a sync target")]
    ReadOnlyScope(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("malformed frontmatter in {}: {reason}", path.display())]
    MalformedFrontmatter { path: PathBuf, reason: String },

    #[error("invalid skill name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("duplicate skill name '{name}' in {scope} scope: {} and {}", first.display(), second.display())]
    DuplicateName {
        name: String,
        scope: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error("backup {id} is corrupt: {reason}")]
    BackupCorrupt { id: String, reason: String },

    #[error("backup store is not writable: {0}")]
    StoreUnwritable(String),

    #[error("backup store is busy: {0}")]
    StoreBusy(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid duration '{0}' (examples: 30s, 15m, 12h, 7d, 2w)")]
    InvalidDuration(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{failed} of {total} skill(s) failed to sync")]
    SyncFailed { failed: usize, total: usize },
}

impl SkillSyncError {
    /// Stable machine-readable code for robot output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::InvalidPlatform(_) => "invalid_platform",
            Self::InvalidScope(_) => "invalid_scope",
            Self::InvalidSpec { .. } => "invalid_spec",
            Self::InvalidStrategy(_) => "invalid_strategy",
            Self::SameSourceAndTarget(_) => "same_source_and_target",
            Self::ReadOnlyScope(_) => "read_only_scope",
            Self::ValidationFailed(_) => "validation_failed",
            Self::PathNotFound(_) => "path_not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::MalformedFrontmatter { .. } => "malformed_frontmatter",
            Self::InvalidName { .. } => "invalid_name",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::BackupNotFound(_) => "backup_not_found",
            Self::BackupCorrupt { .. } => "backup_corrupt",
            Self::StoreUnwritable(_) => "store_unwritable",
            Self::StoreBusy(_) => "store_busy",
            Self::Serialization(_) => "serialization",
            Self::InvalidDuration(_) => "invalid_duration",
            Self::Cancelled => "cancelled",
            Self::SyncFailed { .. } => "sync_failed",
        }
    }

    /// User errors are detected before any I/O happens.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPlatform(_)
                | Self::InvalidScope(_)
                | Self::InvalidSpec { .. }
                | Self::InvalidStrategy(_)
                | Self::SameSourceAndTarget(_)
                | Self::ReadOnlyScope(_)
        )
    }

    /// Map an I/O error on `path` to the taxonomy used by the parsers.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::PathNotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io(err),
        }
    }
}

impl From<serde_json::Error> for SkillSyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkillSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_path_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped = SkillSyncError::from_io(err, "/tmp/missing");
        assert!(matches!(mapped, SkillSyncError::PathNotFound(_)));
        assert_eq!(mapped.code(), "path_not_found");
    }

    #[test]
    fn io_permission_maps_to_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let mapped = SkillSyncError::from_io(err, "/root/secret");
        assert!(matches!(mapped, SkillSyncError::PermissionDenied(_)));
    }

    #[test]
    fn user_errors_are_flagged() {
        assert!(SkillSyncError::InvalidPlatform("vim".into()).is_user_error());
        assert!(!SkillSyncError::Cancelled.is_user_error());
    }

    #[test]
    fn sync_failed_message() {
        let err = SkillSyncError::SyncFailed { failed: 2, total: 5 };
        assert_eq!(err.to_string(), "2 of 5 skill(s) failed to sync");
    }
}
