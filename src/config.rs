//! Layered configuration: defaults, then `config.yaml`, then environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backup::{CleanupOptions, parse_duration};
use crate::core::Platform;
use crate::error::{Result, SkillSyncError};
use crate::sync::Strategy;

pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load from `explicit_path`, or `<root>/config.yaml` when it exists,
    /// then apply environment overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        Self::load_with_env(explicit_path, root, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with an injectable environment lookup.
    pub fn load_with_env(
        explicit_path: Option<&Path>,
        root: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        match explicit_path {
            Some(path) => {
                let patch = Self::load_patch(path)?.ok_or_else(|| {
                    SkillSyncError::Config(format!("config file not found: {}", path.display()))
                })?;
                config.merge_patch(patch);
            }
            None => {
                if let Some(patch) = Self::load_patch(&root.join(CONFIG_FILE))? {
                    config.merge_patch(patch);
                }
            }
        }

        config.apply_env_overrides(&env)?;
        config.validate()?;
        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SkillSyncError::Config(format!("read config {}: {err}", path.display())))?;
        if raw.trim().is_empty() {
            return Ok(Some(ConfigPatch::default()));
        }
        let patch = serde_yaml::from_str(&raw)
            .map_err(|err| SkillSyncError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.sync {
            self.sync.merge(patch);
        }
        if let Some(patch) = patch.backup {
            self.backup.merge(patch);
        }
        if let Some(patch) = patch.platforms {
            self.platforms.merge(patch);
        }
        if let Some(patch) = patch.output {
            self.output.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        for platform in Platform::all() {
            if let Some(paths) = env_list(env, &platform.paths_env_var()) {
                self.platforms.get_mut(*platform).paths = paths;
            }
        }
        if let Some(value) = env(ENV_STRATEGY) {
            self.sync.strategy = value
                .parse()
                .map_err(|err| SkillSyncError::Config(format!("invalid {ENV_STRATEGY}: {err}")))?;
        }
        if let Some(value) = env_bool(env, ENV_BACKUP) {
            self.sync.backup = value;
        }
        if let Some(value) = env(ENV_BACKUP_ROOT).filter(|value| !value.trim().is_empty()) {
            self.backup.root = Some(value);
        }
        if env("NO_COLOR").is_some() {
            self.output.color = false;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.backup.retention()?;
        Ok(())
    }

    /// Configured tier roots for `platform`, highest precedence first.
    /// Empty means the platform defaults.
    #[must_use]
    pub fn platform_paths(&self, platform: Platform) -> &[String] {
        &self.platforms.get(platform).paths
    }

    /// Backup root, relative to `root` unless absolute.
    #[must_use]
    pub fn backup_root(&self, root: &Path, home: &Path) -> PathBuf {
        match &self.backup.root {
            Some(raw) => {
                let path = crate::utils::expand_tilde(raw, home);
                if path.is_absolute() {
                    path
                } else {
                    root.join(path)
                }
            }
            None => root.join("backups"),
        }
    }
}

const ENV_STRATEGY: &str = "SKILLSYNC_STRATEGY";
const ENV_BACKUP: &str = "SKILLSYNC_BACKUP";
const ENV_BACKUP_ROOT: &str = "SKILLSYNC_BACKUP_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_true")]
    pub backup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            backup: true,
        }
    }
}

impl SyncConfig {
    fn merge(&mut self, patch: SyncPatch) {
        if let Some(value) = patch.strategy {
            self.strategy = value;
        }
        if let Some(value) = patch.backup {
            self.backup = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupConfig {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub keep_latest: Option<usize>,
    /// Duration string such as `30d`
    #[serde(default)]
    pub retention: Option<String>,
    #[serde(default)]
    pub auto_cleanup: bool,
}

impl BackupConfig {
    fn merge(&mut self, patch: BackupPatch) {
        if let Some(value) = patch.root {
            self.root = Some(value);
        }
        if let Some(value) = patch.keep_latest {
            self.keep_latest = Some(value);
        }
        if let Some(value) = patch.retention {
            self.retention = Some(value);
        }
        if let Some(value) = patch.auto_cleanup {
            self.auto_cleanup = value;
        }
    }

    pub fn retention(&self) -> Result<Option<Duration>> {
        self.retention
            .as_deref()
            .map(|raw| {
                parse_duration(raw)
                    .map_err(|err| SkillSyncError::Config(format!("backup.retention: {err}")))
            })
            .transpose()
    }

    /// Cleanup rules applied after a sync, when enabled and non-empty.
    pub fn auto_cleanup_options(&self) -> Result<Option<CleanupOptions>> {
        if !self.auto_cleanup {
            return Ok(None);
        }
        let options = CleanupOptions {
            older_than: self.retention()?,
            keep_latest: self.keep_latest,
            ..CleanupOptions::default()
        };
        Ok((!options.is_noop()).then_some(options))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformConfig {
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub claudecode: PlatformConfig,
    #[serde(default)]
    pub cursor: PlatformConfig,
    #[serde(default)]
    pub codex: PlatformConfig,
}

impl PlatformsConfig {
    #[must_use]
    pub const fn get(&self, platform: Platform) -> &PlatformConfig {
        match platform {
            Platform::ClaudeCode => &self.claudecode,
            Platform::Cursor => &self.cursor,
            Platform::Codex => &self.codex,
        }
    }

    fn get_mut(&mut self, platform: Platform) -> &mut PlatformConfig {
        match platform {
            Platform::ClaudeCode => &mut self.claudecode,
            Platform::Cursor => &mut self.cursor,
            Platform::Codex => &mut self.codex,
        }
    }

    fn merge(&mut self, patch: PlatformsPatch) {
        for (platform, entry) in [
            (Platform::ClaudeCode, patch.claudecode),
            (Platform::Cursor, patch.cursor),
            (Platform::Codex, patch.codex),
        ] {
            if let Some(paths) = entry.and_then(|entry| entry.paths) {
                self.get_mut(platform).paths = paths;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl OutputConfig {
    fn merge(&mut self, patch: OutputPatch) {
        if let Some(value) = patch.color {
            self.color = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub sync: Option<SyncPatch>,
    pub backup: Option<BackupPatch>,
    pub platforms: Option<PlatformsPatch>,
    pub output: Option<OutputPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SyncPatch {
    pub strategy: Option<Strategy>,
    pub backup: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BackupPatch {
    pub root: Option<String>,
    pub keep_latest: Option<usize>,
    pub retention: Option<String>,
    pub auto_cleanup: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PlatformsPatch {
    pub claudecode: Option<PlatformPatch>,
    pub cursor: Option<PlatformPatch>,
    pub codex: Option<PlatformPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PlatformPatch {
    pub paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OutputPatch {
    pub color: Option<bool>,
}

const fn default_true() -> bool {
    true
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// `:`-separated list, empty entries dropped.
fn env_list(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Vec<String>> {
    env(key).map(|value| {
        value
            .split(':')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(None, tmp.path(), no_env).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sync.strategy, Strategy::Overwrite);
        assert!(config.sync.backup);
        assert!(config.output.color);
        assert!(config.platform_paths(Platform::Cursor).is_empty());
    }

    #[test]
    fn file_patch_merges_over_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "sync:\n  strategy: three-way\nbackup:\n  keep_latest: 5\n  retention: 30d\n  auto_cleanup: true\nplatforms:\n  cursor:\n    paths: [\"~/work/.cursor\"]\n",
        )
        .unwrap();
        let config = Config::load_with_env(None, tmp.path(), no_env).unwrap();
        assert_eq!(config.sync.strategy, Strategy::ThreeWay);
        assert!(config.sync.backup);
        assert_eq!(config.platform_paths(Platform::Cursor), ["~/work/.cursor".to_string()]);
        let cleanup = config.backup.auto_cleanup_options().unwrap().unwrap();
        assert_eq!(cleanup.keep_latest, Some(5));
        assert_eq!(cleanup.older_than, Some(Duration::from_secs(30 * 86_400)));
    }

    #[test]
    fn env_overrides_win() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "sync:\n  strategy: skip\n").unwrap();
        let env = env_of(&[
            ("SKILLSYNC_STRATEGY", "newer"),
            ("SKILLSYNC_BACKUP", "false"),
            ("SKILLSYNC_CODEX_SKILLS_PATHS", "/a/.codex:/b/.codex"),
            ("NO_COLOR", ""),
        ]);
        let config = Config::load_with_env(None, tmp.path(), env).unwrap();
        assert_eq!(config.sync.strategy, Strategy::Newer);
        assert!(!config.sync.backup);
        assert!(!config.output.color);
        assert_eq!(
            config.platform_paths(Platform::Codex),
            ["/a/.codex".to_string(), "/b/.codex".to_string()]
        );
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_of(&[("SKILLSYNC_STRATEGY", "yolo")]);
        assert!(matches!(
            Config::load_with_env(None, tmp.path(), env),
            Err(SkillSyncError::Config(_))
        ));

        std::fs::write(tmp.path().join(CONFIG_FILE), "backup:\n  retention: forever\n").unwrap();
        assert!(matches!(
            Config::load_with_env(None, tmp.path(), no_env),
            Err(SkillSyncError::Config(_))
        ));

        std::fs::write(tmp.path().join(CONFIG_FILE), "sync: [unclosed\n").unwrap();
        assert!(matches!(
            Config::load_with_env(None, tmp.path(), no_env),
            Err(SkillSyncError::Config(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.yaml");
        assert!(Config::load_with_env(Some(&missing), tmp.path(), no_env).is_err());
    }

    #[test]
    fn backup_root_resolution() {
        let root = Path::new("/data/skillsync");
        let home = Path::new("/home/u");
        let mut config = Config::default();
        assert_eq!(config.backup_root(root, home), root.join("backups"));
        config.backup.root = Some("~/snapshots".to_string());
        assert_eq!(config.backup_root(root, home), home.join("snapshots"));
        config.backup.root = Some("local".to_string());
        assert_eq!(config.backup_root(root, home), root.join("local"));
    }
}
