use std::path::{Path, PathBuf};

use crate::backup::BackupStore;
use crate::cli::colors::ColorSupport;
use crate::cli::output::OutputMode;
use crate::config::{CONFIG_FILE, Config};
use crate::core::{Platform, Scope};
use crate::error::{Result, SkillSyncError};
use crate::parser::{ScopedPath, TieredParser};
use crate::sync::{CancelFlag, Destination, SyncSpec};
use crate::utils::expand_tilde;

/// Everything a command needs, resolved once at startup.
pub struct AppContext {
    /// `$SKILLSYNC_HOME` or `~/.skillsync`
    pub root: PathBuf,
    pub home: PathBuf,
    /// Working directory; repo-scope tiers live under it
    pub repo_root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub output_mode: OutputMode,
    pub colors: ColorSupport,
    pub verbosity: u8,
    pub cancel: CancelFlag,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SkillSyncError::Config("home directory not found".to_string()))?;
        let root = Self::find_root(&home);
        let repo_root = std::env::current_dir()?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| root.join(CONFIG_FILE));
        let config = Config::load(cli.config.as_deref(), &root)?;

        let colors = if config.output.color && !cli.robot {
            ColorSupport::detect()
        } else {
            ColorSupport::None
        };

        Ok(Self {
            root,
            home,
            repo_root,
            config_path,
            config,
            output_mode: if cli.robot {
                OutputMode::Robot
            } else {
                OutputMode::Human
            },
            colors,
            verbosity: cli.verbose,
            cancel: CancelFlag::new(),
        })
    }

    /// Context over explicit directories, for tests and embedding.
    #[must_use]
    pub fn new(root: PathBuf, home: PathBuf, repo_root: PathBuf, config: Config) -> Self {
        Self {
            config_path: root.join(CONFIG_FILE),
            root,
            home,
            repo_root,
            config,
            output_mode: OutputMode::Human,
            colors: ColorSupport::None,
            verbosity: 0,
            cancel: CancelFlag::new(),
        }
    }

    fn find_root(home: &Path) -> PathBuf {
        match std::env::var("SKILLSYNC_HOME") {
            Ok(root) if !root.trim().is_empty() => expand_tilde(&root, home),
            _ => home.join(".skillsync"),
        }
    }

    #[must_use]
    pub fn is_robot(&self) -> bool {
        self.output_mode == OutputMode::Robot
    }

    /// Tier roots for `platform`, highest precedence first.
    ///
    /// Configured paths replace the defaults; their scope is inferred from
    /// where they live.
    #[must_use]
    pub fn tiers(&self, platform: Platform) -> Vec<ScopedPath> {
        let configured = self.config.platform_paths(platform);
        if configured.is_empty() {
            return platform
                .default_tiers(&self.repo_root, &self.home)
                .into_iter()
                .map(|(scope, path)| ScopedPath::new(scope, path))
                .collect();
        }
        configured
            .iter()
            .map(|raw| {
                let path = expand_tilde(raw, &self.home);
                let path = if path.is_absolute() {
                    path
                } else {
                    self.repo_root.join(path)
                };
                ScopedPath::inferred(path, &self.repo_root, &self.home)
            })
            .collect()
    }

    /// Tiered parser over the scopes a source spec names.
    #[must_use]
    pub fn source_parser(&self, spec: &SyncSpec) -> TieredParser {
        TieredParser::new(spec.platform, self.tiers(spec.platform)).with_scopes(&spec.scopes)
    }

    /// Where writes for `platform` at `scope` land.
    #[must_use]
    pub fn destination(&self, platform: Platform, scope: Scope) -> Destination {
        let root = self
            .tiers(platform)
            .into_iter()
            .find(|tier| tier.scope == scope)
            .map_or_else(
                || {
                    let base = if scope == Scope::Repo {
                        &self.repo_root
                    } else {
                        &self.home
                    };
                    base.join(platform.config_dir_name())
                },
                |tier| tier.path,
            );
        Destination::new(platform, scope, root)
    }

    #[must_use]
    pub fn backup_store(&self) -> BackupStore {
        BackupStore::new(self.config.backup_root(&self.root, &self.home))
    }
}
