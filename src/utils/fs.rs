//! Filesystem utilities.
//!
//! Every file that skillsync writes into a skill tree or the backup store
//! goes through [`atomic_write`] so a crash never leaves a half-written file
//! behind.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{Result, SkillSyncError};

/// Mode for directories created inside skill trees and the backup store.
pub const DIR_MODE: u32 = 0o750;
/// Mode for skill files and backup copies.
pub const FILE_MODE: u32 = 0o644;

/// Ensure a directory exists, creating missing parents with [`DIR_MODE`].
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder
        .create(path)
        .map_err(|err| SkillSyncError::from_io(err, path))
}

/// Read a file to string, returning None if it doesn't exist.
pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SkillSyncError::from_io(err, path)),
    }
}

/// Write `bytes` to `path` atomically.
///
/// The data goes to a temporary file in the destination directory, is
/// flushed to disk and then renamed over `path`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|err| SkillSyncError::from_io(err, parent))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    }
    tmp.persist(path)
        .map_err(|err| SkillSyncError::from_io(err.error, path))?;
    Ok(())
}

/// Remove `path`, then any parent directories up to (not including) `stop`
/// that were left empty.
pub fn remove_file_pruning(path: &Path, stop: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|err| SkillSyncError::from_io(err, path))?;
    let mut dir = path.parent();
    while let Some(current) = dir {
        if current == stop || !current.starts_with(stop) {
            break;
        }
        let is_empty = fs::read_dir(current)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty || fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
    Ok(())
}

/// SHA-256 of a file's bytes, formatted `sha256:<hex>`.
pub fn file_checksum(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|err| SkillSyncError::from_io(err, path))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// SHA-256 of in-memory bytes, formatted `sha256:<hex>`.
#[must_use]
pub fn bytes_checksum(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// Modification time of `path`, if the platform reports one.
#[must_use]
pub fn mod_time(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Closest ancestor of `path` (or `path` itself) that exists.
#[must_use]
pub fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|candidate| !candidate.as_os_str().is_empty() && candidate.exists())
        .map(Path::to_path_buf)
}

/// Expand a leading `~` to `home`.
#[must_use]
pub fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}
