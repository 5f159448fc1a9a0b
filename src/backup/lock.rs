//! Advisory lock over the backup store.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SkillSyncError};
use crate::utils::ensure_dir;

/// How long mutating store operations wait for a concurrent holder.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on `<root>/.lock`, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    const LOCK_FILENAME: &'static str = ".lock";

    /// Try once without blocking. `Ok(None)` means someone else holds it.
    pub fn try_acquire(root: &Path) -> Result<Option<Self>> {
        ensure_dir(root)
            .map_err(|err| SkillSyncError::StoreUnwritable(format!("{}: {err}", root.display())))?;
        let path = root.join(Self::LOCK_FILENAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| SkillSyncError::StoreUnwritable(format!("{}: {err}", path.display())))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(err) if is_contended(&err) => return Ok(None),
            Err(err) => return Err(SkillSyncError::from_io(err, &path)),
        }

        write_lock_info(&file)?;
        trace!(path = %path.display(), "store lock acquired");
        Ok(Some(Self { file, path }))
    }

    /// Poll until acquired or `timeout` elapses, then fail with `StoreBusy`.
    pub fn acquire_timeout(root: &Path, timeout: Duration) -> Result<Self> {
        let start = Instant::now();
        loop {
            if let Some(lock) = Self::try_acquire(root)? {
                return Ok(lock);
            }
            if start.elapsed() >= timeout {
                let holder = Self::read_lock_info(root)
                    .map(|info| format!("held by pid {} on {} since {}", info.pid, info.hostname, info.acquired_at))
                    .unwrap_or_else(|| "held by another process".to_string());
                debug!(root = %root.display(), %holder, "store lock timed out");
                return Err(SkillSyncError::StoreBusy(holder));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Holder recorded in the lock file, if readable.
    #[must_use]
    pub fn read_lock_info(root: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(root.join(Self::LOCK_FILENAME)).ok()?;
        serde_json::from_str(&content).ok()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Information about the lock holder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub hostname: String,
}

fn write_lock_info(file: &File) -> Result<()> {
    let info = LockInfo {
        pid: std::process::id(),
        acquired_at: Utc::now(),
        hostname: hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string()),
    };
    let mut file = file;
    file.set_len(0)?;
    file.write_all(serde_json::to_string_pretty(&info)?.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let first = StoreLock::try_acquire(dir.path()).unwrap();
        assert!(first.is_some());
        assert!(StoreLock::try_acquire(dir.path()).unwrap().is_none());
        drop(first);
        assert!(StoreLock::try_acquire(dir.path()).unwrap().is_some());
    }

    #[test]
    fn timeout_reports_store_busy() {
        let dir = tempfile::tempdir().unwrap();
        let _held = StoreLock::try_acquire(dir.path()).unwrap().unwrap();
        let err = StoreLock::acquire_timeout(dir.path(), Duration::from_millis(120)).unwrap_err();
        assert!(matches!(err, SkillSyncError::StoreBusy(_)));
        assert!(err.to_string().contains(&std::process::id().to_string()));
    }

    #[test]
    fn lock_info_records_holder() {
        let dir = tempfile::tempdir().unwrap();
        let lock = StoreLock::acquire_timeout(dir.path(), LOCK_TIMEOUT).unwrap();
        assert!(lock.path().ends_with(".lock"));
        let info = StoreLock::read_lock_info(dir.path()).unwrap();
        assert_eq!(info.pid, std::process::id());
    }
}
