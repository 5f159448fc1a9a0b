//! Content-addressed snapshots of skill files.
//!
//! Layout:
//!
//! ```text
//! <root>/.lock
//! <root>/index.json
//! <root>/<platform>/<id>/index.json
//! <root>/<platform>/<id>/<relative path>...
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::index::{BackupFile, BackupIndex, BackupMetadata, BackupRecord, files_checksum};
use super::lock::{LOCK_TIMEOUT, StoreLock};
use super::retention::{CleanupOptions, select_for_cleanup};
use crate::core::Platform;
use crate::error::{Result, SkillSyncError};
use crate::security::safe_join;
use crate::utils::{atomic_write, bytes_checksum, ensure_dir, file_checksum};

const ID_SUFFIX_LEN: usize = 8;

/// Filter for [`BackupStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub platform: Option<Platform>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    Ok,
    Corrupt,
}

/// One file that failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileProblem {
    pub relative_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub id: String,
    pub status: VerifyStatus,
    pub checked: usize,
    pub problems: Vec<FileProblem>,
}

impl VerifyReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == VerifyStatus::Ok
    }
}

/// Backup store rooted at one directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `paths` into a new backup and return its metadata.
    pub fn snapshot(&self, platform: Platform, paths: &[PathBuf]) -> Result<BackupMetadata> {
        let source_path = common_ancestor(paths).ok_or_else(|| {
            SkillSyncError::ValidationFailed("snapshot needs at least one absolute file".to_string())
        })?;

        let _lock = self.lock()?;
        let platform_dir = self.root.join(platform.as_str());
        ensure_dir(&platform_dir).map_err(|err| self.unwritable(&err))?;

        let id = fresh_id(&platform_dir, Utc::now());
        let staging = platform_dir.join(format!(".tmp-{id}"));
        let storage_path = platform_dir.join(&id);

        let record = match self.stage(&staging, &source_path, paths) {
            Ok(files) => {
                let metadata = BackupMetadata {
                    id: id.clone(),
                    platform,
                    source_path,
                    storage_path: storage_path.clone(),
                    size: files.iter().map(|file| file.size).sum(),
                    created_at: Utc::now(),
                    checksum: files_checksum(&files),
                };
                BackupRecord { metadata, files }
            }
            Err(err) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(err);
            }
        };

        let committed = record
            .save(&staging)
            .and_then(|()| fs::rename(&staging, &storage_path).map_err(Into::into));
        if let Err(err) = committed {
            let _ = fs::remove_dir_all(&staging);
            return Err(self.unwritable(&err));
        }

        let mut index = BackupIndex::load_or_rebuild(&self.root)?;
        if index.find(&id).is_none() {
            index.backups.push(record.metadata.clone());
        }
        index.sort();
        index.save(&self.root)?;

        info!(
            id = %id,
            platform = %platform,
            files = record.files.len(),
            size = record.metadata.size,
            "created backup"
        );
        Ok(record.metadata)
    }

    /// Backups matching `filter`, newest first.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<BackupMetadata>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let index = BackupIndex::load_or_rebuild(&self.root)?;
        let matching = index
            .backups
            .into_iter()
            .filter(|backup| filter.platform.is_none_or(|platform| backup.platform == platform))
            .filter(|backup| filter.since.is_none_or(|since| backup.created_at >= since));
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    /// Full record of one backup.
    pub fn get(&self, id: &str) -> Result<BackupRecord> {
        let dir = self.locate(id)?;
        BackupRecord::load(&dir)
    }

    /// Recompute every checksum of a backup.
    pub fn verify(&self, id: &str) -> Result<VerifyReport> {
        let dir = self.locate(id)?;
        let record = BackupRecord::load(&dir)?;
        let mut problems = Vec::new();

        for file in &record.files {
            let copy = match safe_join(&dir, &file.relative_path) {
                Ok(copy) => copy,
                Err(err) => {
                    problems.push(FileProblem {
                        relative_path: file.relative_path.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            match file_checksum(&copy) {
                Ok(actual) if actual == file.checksum => {}
                Ok(actual) => problems.push(FileProblem {
                    relative_path: file.relative_path.clone(),
                    reason: format!("checksum mismatch: expected {}, found {actual}", file.checksum),
                }),
                Err(err) => problems.push(FileProblem {
                    relative_path: file.relative_path.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        let recomputed = files_checksum(&record.files);
        if recomputed != record.metadata.checksum {
            problems.push(FileProblem {
                relative_path: PathBuf::from("index.json"),
                reason: "file list does not match the recorded backup checksum".to_string(),
            });
        }

        let status = if problems.is_empty() {
            VerifyStatus::Ok
        } else {
            VerifyStatus::Corrupt
        };
        debug!(id, ?status, checked = record.files.len(), "verified backup");
        Ok(VerifyReport {
            id: id.to_string(),
            status,
            checked: record.files.len(),
            problems,
        })
    }

    /// Copy a backup's files back to where they were taken from.
    ///
    /// The backup is verified first; a corrupt backup restores nothing.
    pub fn restore(&self, id: &str) -> Result<Vec<PathBuf>> {
        let report = self.verify(id)?;
        if let Some(problem) = report.problems.first() {
            return Err(SkillSyncError::BackupCorrupt {
                id: id.to_string(),
                reason: format!("{}: {}", problem.relative_path.display(), problem.reason),
            });
        }

        let _lock = self.lock()?;
        let dir = self.locate(id)?;
        let record = BackupRecord::load(&dir)?;
        let mut written = Vec::with_capacity(record.files.len());
        for file in &record.files {
            let copy = safe_join(&dir, &file.relative_path)?;
            let dest = safe_join(&record.metadata.source_path, &file.relative_path)?;
            let bytes = fs::read(&copy).map_err(|err| SkillSyncError::from_io(err, &copy))?;
            atomic_write(&dest, &bytes)?;
            debug!(id, path = %dest.display(), "restored file");
            written.push(dest);
        }
        info!(id, files = written.len(), "restored backup");
        Ok(written)
    }

    /// Remove backups according to `options`; returns the affected ids.
    pub fn cleanup(&self, options: &CleanupOptions) -> Result<Vec<String>> {
        self.cleanup_at(options, Utc::now())
    }

    pub fn cleanup_at(&self, options: &CleanupOptions, now: DateTime<Utc>) -> Result<Vec<String>> {
        if !self.root.exists() || options.is_noop() {
            return Ok(Vec::new());
        }
        let _lock = self.lock()?;
        let mut index = BackupIndex::load_or_rebuild(&self.root)?;
        let doomed = select_for_cleanup(&index.backups, options, now)?;
        if options.dry_run || doomed.is_empty() {
            return Ok(doomed);
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            let Some(backup) = index.find(&id) else {
                continue;
            };
            match fs::remove_dir_all(&backup.storage_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(id = %id, error = %err, "failed to remove backup");
                    continue;
                }
            }
            debug!(id = %id, "removed backup");
            removed.push(id);
        }
        index.backups.retain(|backup| !removed.contains(&backup.id));
        index.save(&self.root)?;
        info!(removed = removed.len(), "cleaned up backups");
        Ok(removed)
    }

    fn lock(&self) -> Result<StoreLock> {
        ensure_dir(&self.root).map_err(|err| self.unwritable(&err))?;
        StoreLock::acquire_timeout(&self.root, self.lock_timeout)
    }

    fn locate(&self, id: &str) -> Result<PathBuf> {
        crate::security::path_policy::validate_path_component(id)
            .map_err(|_| SkillSyncError::BackupNotFound(id.to_string()))?;
        Platform::all()
            .iter()
            .map(|platform| self.root.join(platform.as_str()).join(id))
            .find(|dir| dir.join(super::index::INDEX_FILE).is_file())
            .ok_or_else(|| SkillSyncError::BackupNotFound(id.to_string()))
    }

    fn stage(&self, staging: &Path, source_path: &Path, paths: &[PathBuf]) -> Result<Vec<BackupFile>> {
        ensure_dir(staging).map_err(|err| self.unwritable(&err))?;
        let mut files = Vec::with_capacity(paths.len());
        let mut sorted: Vec<&PathBuf> = paths.iter().collect();
        sorted.sort();
        sorted.dedup();
        for path in sorted {
            let bytes = fs::read(path).map_err(|err| SkillSyncError::from_io(err, path))?;
            let relative_path = path
                .strip_prefix(source_path)
                .map_err(|_| {
                    SkillSyncError::ValidationFailed(format!(
                        "{} is outside {}",
                        path.display(),
                        source_path.display()
                    ))
                })?
                .to_path_buf();
            let copy = safe_join(staging, &relative_path)?;
            atomic_write(&copy, &bytes).map_err(|err| self.unwritable(&err))?;
            files.push(BackupFile {
                checksum: bytes_checksum(&bytes),
                size: bytes.len() as u64,
                relative_path,
            });
        }
        Ok(files)
    }

    fn unwritable(&self, err: &SkillSyncError) -> SkillSyncError {
        match err {
            SkillSyncError::StoreBusy(_) | SkillSyncError::StoreUnwritable(_) => {
                SkillSyncError::StoreUnwritable(err.to_string())
            }
            _ => SkillSyncError::StoreUnwritable(format!("{}: {err}", self.root.display())),
        }
    }
}

fn fresh_id(platform_dir: &Path, now: DateTime<Utc>) -> String {
    loop {
        let id = generate_id(now);
        if !platform_dir.join(&id).exists() {
            return id;
        }
    }
}

/// `YYYYMMDDTHHMMSSZ-xxxxxxxx`
fn generate_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();
    format!("{}-{suffix}", now.format("%Y%m%dT%H%M%SZ"))
}

/// Deepest directory containing every path's parent.
fn common_ancestor(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut iter = paths.iter().filter(|path| path.is_absolute());
    let mut common = iter.next()?.parent()?.to_path_buf();
    for path in iter {
        while !path.starts_with(&common) {
            common = common.parent()?.to_path_buf();
        }
    }
    Some(common)
}
