use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use crate::app::AppContext;
use crate::config::Config;
use crate::core::Platform;

/// Isolated home directory, repository and skillsync root.
///
/// Layout under one temp dir:
///
/// ```text
/// home/             $HOME, user-scope tiers (.claude, .cursor, .codex)
/// home/.skillsync   $SKILLSYNC_HOME, config and backups
/// repo/             working directory, repo-scope tiers
/// ```
pub struct SkillTreeFixture {
    pub temp_dir: TempDir,
    pub home: PathBuf,
    pub repo: PathBuf,
    pub root: PathBuf,
}

impl Default for SkillTreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillTreeFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let home = temp_dir.path().join("home");
        let repo = temp_dir.path().join("repo");
        let root = home.join(".skillsync");
        for dir in [&home, &repo, &root] {
            fs::create_dir_all(dir).expect("Failed to create fixture dirs");
        }
        println!("[FIXTURE] Created skill tree: {:?}", temp_dir.path());
        Self {
            temp_dir,
            home,
            repo,
            root,
        }
    }

    /// Context over the fixture directories with default config.
    #[must_use]
    pub fn context(&self) -> AppContext {
        self.context_with(Config::default())
    }

    #[must_use]
    pub fn context_with(&self, config: Config) -> AppContext {
        AppContext::new(
            self.root.clone(),
            self.home.clone(),
            self.repo.clone(),
            config,
        )
    }

    /// User-scope tier root for `platform`, e.g. `home/.claude`.
    #[must_use]
    pub fn user_dir(&self, platform: Platform) -> PathBuf {
        self.home.join(platform.config_dir_name())
    }

    /// Repo-scope tier root for `platform`, e.g. `repo/.cursor`.
    #[must_use]
    pub fn repo_dir(&self, platform: Platform) -> PathBuf {
        self.repo.join(platform.config_dir_name())
    }

    /// Write `content` to `path`, creating parent directories.
    pub fn write(&self, path: &Path, content: &str) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(path, content).expect("Failed to write file");
        path.to_path_buf()
    }

    /// `<tier>/skills/<name>/SKILL.md` (Claude Code and Codex).
    pub fn skill_dir_file(&self, tier: &Path, name: &str, description: &str, body: &str) -> PathBuf {
        self.write(
            &tier.join("skills").join(name).join("SKILL.md"),
            &skill_markdown(name, description, body),
        )
    }

    /// `<tier>/skills/<name>.md` (Cursor).
    pub fn cursor_skill(&self, tier: &Path, name: &str, description: &str, body: &str) -> PathBuf {
        self.write(
            &tier.join("skills").join(format!("{name}.md")),
            &skill_markdown(name, description, body),
        )
    }

    /// `<tier>/commands/<name>.md` (Claude Code slash command).
    pub fn claude_command(&self, tier: &Path, name: &str, body: &str) -> PathBuf {
        self.write(&tier.join("commands").join(format!("{name}.md")), body)
    }

    /// Read a file the test expects to exist.
    #[must_use]
    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
    }

    /// Move a file's mtime `secs_ago` seconds into the past.
    pub fn age(&self, path: &Path, secs_ago: u64) {
        let when = SystemTime::now() - Duration::from_secs(secs_ago);
        let file = fs::OpenOptions::new()
            .write(true)
            .open(path)
            .expect("Failed to open file for mtime");
        file.set_modified(when).expect("Failed to set mtime");
    }
}

/// Minimal skill file with `name` and `description` frontmatter.
#[must_use]
pub fn skill_markdown(name: &str, description: &str, body: &str) -> String {
    format!("---\nname: {name}\ndescription: {description}\n---\n{body}")
}

impl Drop for SkillTreeFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Cleaning up skill tree: {:?}", self.temp_dir.path());
    }
}
