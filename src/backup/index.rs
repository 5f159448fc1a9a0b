//! On-disk index records.
//!
//! Each backup directory carries its own `index.json` ([`BackupRecord`]).
//! The store root keeps `index.json` ([`BackupIndex`]) listing every backup;
//! it can always be rebuilt from the per-backup records.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::Platform;
use crate::error::{Result, SkillSyncError};
use crate::utils::{atomic_write, read_optional};

pub const INDEX_FILE: &str = "index.json";
const INDEX_VERSION: u32 = 1;

/// Summary of one backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub platform: Platform,
    /// Directory the snapshotted files were taken from
    pub source_path: PathBuf,
    /// Directory holding the copies inside the store
    pub storage_path: PathBuf,
    /// Total bytes copied
    pub size: u64,
    pub created_at: DateTime<Utc>,
    /// Fingerprint over every file's relative path and checksum
    pub checksum: String,
}

/// One file inside a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupFile {
    pub relative_path: PathBuf,
    pub size: u64,
    pub checksum: String,
}

/// Contents of a backup's own `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    #[serde(flatten)]
    pub metadata: BackupMetadata,
    pub files: Vec<BackupFile>,
}

impl BackupRecord {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let text = fs::read_to_string(&path).map_err(|err| SkillSyncError::from_io(err, &path))?;
        serde_json::from_str(&text).map_err(|err| SkillSyncError::BackupCorrupt {
            id: dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            reason: format!("unreadable index: {err}"),
        })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(&dir.join(INDEX_FILE), json.as_bytes())
    }
}

/// Store-wide listing at `<root>/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupIndex {
    pub version: u32,
    pub backups: Vec<BackupMetadata>,
}

impl Default for BackupIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            backups: Vec::new(),
        }
    }
}

impl BackupIndex {
    /// Load the root index, rebuilding it from per-backup records when it
    /// is missing or unreadable.
    pub fn load_or_rebuild(root: &Path) -> Result<Self> {
        let path = root.join(INDEX_FILE);
        if let Some(text) = read_optional(&path)? {
            match serde_json::from_str::<Self>(&text) {
                Ok(mut index) => {
                    index.sort();
                    return Ok(index);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "backup index unreadable, rebuilding"),
            }
        }
        Self::rebuild(root)
    }

    /// Scan `<root>/<platform>/<id>/index.json`.
    pub fn rebuild(root: &Path) -> Result<Self> {
        let mut index = Self::default();
        for platform in Platform::all() {
            let dir = root.join(platform.as_str());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(SkillSyncError::from_io(err, &dir)),
            };
            for entry in entries {
                let entry = entry?;
                let name = entry.file_name();
                if name.to_string_lossy().starts_with('.') || !entry.path().is_dir() {
                    continue;
                }
                match BackupRecord::load(&entry.path()) {
                    Ok(record) => index.backups.push(record.metadata),
                    Err(err) => warn!(path = %entry.path().display(), error = %err, "skipping backup"),
                }
            }
        }
        index.sort();
        debug!(root = %root.display(), backups = index.backups.len(), "rebuilt backup index");
        Ok(index)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(&root.join(INDEX_FILE), json.as_bytes())
    }

    /// Newest first; ids break ties.
    pub fn sort(&mut self) {
        self.backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&BackupMetadata> {
        self.backups.iter().find(|backup| backup.id == id)
    }
}

/// Fingerprint of a file list: SHA-256 over sorted `path\0checksum\n` lines.
#[must_use]
pub fn files_checksum(files: &[BackupFile]) -> String {
    let mut lines: Vec<String> = files
        .iter()
        .map(|file| format!("{}\0{}\n", file.relative_path.display(), file.checksum))
        .collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
    }
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
