//! Retention rules and duration parsing for cleanup.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::index::BackupMetadata;
use crate::core::Platform;
use crate::error::{Result, SkillSyncError};

/// Parse a human duration such as `30s`, `12h`, `7d`, `2w` or `1w 2d`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SkillSyncError::InvalidDuration(raw.to_string()));
    }
    humantime::parse_duration(trimmed).map_err(|_| SkillSyncError::InvalidDuration(raw.to_string()))
}

/// Which backups `cleanup` may remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    pub older_than: Option<Duration>,
    pub keep_latest: Option<usize>,
    pub platform: Option<Platform>,
    pub dry_run: bool,
}

impl CleanupOptions {
    #[must_use]
    pub fn older_than(mut self, duration: Duration) -> Self {
        self.older_than = Some(duration);
        self
    }

    #[must_use]
    pub fn keep_latest(mut self, count: usize) -> Self {
        self.keep_latest = Some(count);
        self
    }

    #[must_use]
    pub fn for_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.older_than.is_none() && self.keep_latest.is_none()
    }
}

/// Ids of the backups that `options` would remove at time `now`.
///
/// Backups are grouped per platform and ordered newest first. The newest
/// backup of every platform always survives.
pub fn select_for_cleanup(
    backups: &[BackupMetadata],
    options: &CleanupOptions,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    if options.is_noop() {
        return Ok(Vec::new());
    }
    let cutoff = match options.older_than {
        Some(duration) => {
            let delta = TimeDelta::from_std(duration)
                .map_err(|_| SkillSyncError::InvalidDuration(format!("{duration:?}")))?;
            Some(now - delta)
        }
        None => None,
    };

    let mut groups: BTreeMap<Platform, Vec<&BackupMetadata>> = BTreeMap::new();
    for backup in backups {
        if options.platform.is_some_and(|platform| platform != backup.platform) {
            continue;
        }
        groups.entry(backup.platform).or_default().push(backup);
    }

    let mut doomed = Vec::new();
    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        let keep = options.keep_latest.map_or(1, |count| count.max(1));
        for backup in group.iter().skip(keep) {
            let expired = cutoff.is_none_or(|cutoff| backup.created_at < cutoff);
            if expired {
                doomed.push(backup.id.clone());
            }
        }
    }
    Ok(doomed)
}
