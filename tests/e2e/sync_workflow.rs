//! E2E Scenario: sync workflows driven through the library API.
//!
//! Covers repo-over-user precedence, ordered path overrides, `--delete`,
//! Codex aggregate input, the interactive strategy and Claude Code
//! commands landing on Cursor.

use skillsync::config::Config;
use skillsync::core::{Platform, Scope};
use skillsync::error::SkillSyncError;
use skillsync::sync::{
    Choice, ScriptedResolver, Strategy, SyncAction, SyncEngine, SyncOptions, SyncSpec,
};
use skillsync::test_utils::fixtures::SkillTreeFixture;

// ============================================================================
// Helpers
// ============================================================================

fn engine(fx: &SkillTreeFixture, source: &str, target: Platform, options: SyncOptions) -> SyncEngine {
    let ctx = fx.context();
    let spec: SyncSpec = source.parse().unwrap();
    SyncEngine::new(
        ctx.source_parser(&spec),
        ctx.destination(target, Scope::User),
        options,
    )
    .with_backup_store(ctx.backup_store())
}

fn options(strategy: Strategy) -> SyncOptions {
    SyncOptions {
        strategy,
        backup: false,
        ..SyncOptions::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn repo_scope_shadows_user_scope() {
    let fx = SkillTreeFixture::new();
    fx.skill_dir_file(&fx.user_dir(Platform::ClaudeCode), "review", "user", "user body\n");
    fx.skill_dir_file(&fx.repo_dir(Platform::ClaudeCode), "review", "repo", "repo body\n");

    let sync = engine(&fx, "claudecode", Platform::Cursor, options(Strategy::Overwrite));
    let result = sync.run(&mut ScriptedResolver::always(Choice::Skip)).unwrap();

    assert_eq!(result.count(SyncAction::Created), 1);
    let written = fx.read(&fx.user_dir(Platform::Cursor).join("skills/review.md"));
    assert_eq!(written, "---\nname: review\ndescription: repo\n---\nrepo body\n");
}

#[test]
fn ordered_path_override_prefers_first_root() {
    let fx = SkillTreeFixture::new();
    let first = fx.home.join("first/.codex");
    let second = fx.home.join("second/.codex");
    fx.skill_dir_file(&first, "x", "first", "first body\n");
    fx.skill_dir_file(&second, "x", "second", "second body\n");
    fx.skill_dir_file(&second, "y", "only second", "y body\n");

    let paths = format!("{}:{}", first.display(), second.display());
    let config = Config::load_with_env(None, &fx.root, |key| {
        (key == "SKILLSYNC_CODEX_SKILLS_PATHS").then(|| paths.clone())
    })
    .unwrap();
    let ctx = fx.context_with(config);
    let tiers = ctx.tiers(Platform::Codex);
    assert!(tiers.iter().all(|tier| tier.scope == Scope::User));

    let spec: SyncSpec = "codex".parse().unwrap();
    let sync = SyncEngine::new(
        ctx.source_parser(&spec),
        ctx.destination(Platform::ClaudeCode, Scope::User),
        options(Strategy::Overwrite),
    );
    let result = sync.run(&mut ScriptedResolver::always(Choice::Skip)).unwrap();

    assert_eq!(result.count(SyncAction::Created), 2);
    let written = fx.read(&fx.user_dir(Platform::ClaudeCode).join("skills/x/SKILL.md"));
    assert_eq!(written, "---\nname: x\ndescription: first\n---\nfirst body\n");
}

#[test]
fn scope_filter_limits_the_source() {
    let fx = SkillTreeFixture::new();
    fx.skill_dir_file(&fx.user_dir(Platform::ClaudeCode), "review", "user", "user body\n");
    fx.skill_dir_file(&fx.repo_dir(Platform::ClaudeCode), "review", "repo", "repo body\n");

    let sync = engine(&fx, "claudecode:user", Platform::Cursor, options(Strategy::Overwrite));
    sync.run(&mut ScriptedResolver::always(Choice::Skip)).unwrap();

    let written = fx.read(&fx.user_dir(Platform::Cursor).join("skills/review.md"));
    assert!(written.contains("description: user"));
}

#[test]
fn delete_removes_target_only_skills() {
    let fx = SkillTreeFixture::new();
    fx.skill_dir_file(&fx.user_dir(Platform::ClaudeCode), "keep", "K", "keep\n");
    let stale = fx.cursor_skill(&fx.user_dir(Platform::Cursor), "stale", "S", "stale\n");

    let kept = engine(&fx, "claudecode", Platform::Cursor, options(Strategy::Overwrite))
        .run(&mut ScriptedResolver::always(Choice::Skip))
        .unwrap();
    assert_eq!(kept.count(SyncAction::Skipped), 1);
    assert!(stale.exists());

    let opts = SyncOptions {
        delete: true,
        ..options(Strategy::Overwrite)
    };
    let deleted = engine(&fx, "claudecode", Platform::Cursor, opts)
        .run(&mut ScriptedResolver::always(Choice::Skip))
        .unwrap();
    assert_eq!(deleted.count(SyncAction::Deleted), 1);
    assert!(!stale.exists());
}

#[test]
fn codex_aggregate_requires_skip_validation() {
    let fx = SkillTreeFixture::new();
    fx.write(
        &fx.user_dir(Platform::Codex).join("config.toml"),
        "[skills.lint]\ndescription = \"Lint code\"\ninstructions = \"Run the linter.\"\n",
    );

    let err = engine(&fx, "codex", Platform::ClaudeCode, options(Strategy::Overwrite))
        .prepare()
        .unwrap_err();
    assert!(matches!(err, SkillSyncError::ValidationFailed(_)));

    let opts = SyncOptions {
        validate: false,
        ..options(Strategy::Overwrite)
    };
    let result = engine(&fx, "codex", Platform::ClaudeCode, opts)
        .run(&mut ScriptedResolver::always(Choice::Skip))
        .unwrap();
    assert_eq!(result.count(SyncAction::Created), 1);
    let written = fx.read(&fx.user_dir(Platform::ClaudeCode).join("skills/lint/SKILL.md"));
    assert_eq!(written, "---\nname: lint\ndescription: Lint code\n---\nRun the linter.\n");
}

#[test]
fn interactive_applies_scripted_choices() {
    let fx = SkillTreeFixture::new();
    let claude = fx.user_dir(Platform::ClaudeCode);
    let cursor = fx.user_dir(Platform::Cursor);
    fx.skill_dir_file(&claude, "alpha", "A", "source a\n");
    fx.skill_dir_file(&claude, "beta", "B", "source b\n");
    let alpha = fx.cursor_skill(&cursor, "alpha", "A", "target a\n");
    let beta = fx.cursor_skill(&cursor, "beta", "B", "target b\n");

    let sync = engine(&fx, "claudecode", Platform::Cursor, options(Strategy::Interactive));
    let mut resolver = ScriptedResolver::new([Choice::UseSource, Choice::UseTarget]);
    let result = sync.run(&mut resolver).unwrap();

    assert_eq!(result.count(SyncAction::Updated), 1);
    assert_eq!(result.count(SyncAction::Skipped), 1);
    assert!(fx.read(&alpha).ends_with("source a\n"));
    assert!(fx.read(&beta).ends_with("target b\n"));
}

#[test]
fn claude_commands_keep_their_prompt_type() {
    let fx = SkillTreeFixture::new();
    fx.claude_command(&fx.user_dir(Platform::ClaudeCode), "deploy", "Ship it.\n");

    engine(&fx, "claudecode", Platform::Cursor, options(Strategy::Overwrite))
        .run(&mut ScriptedResolver::always(Choice::Skip))
        .unwrap();

    let written = fx.read(&fx.user_dir(Platform::Cursor).join("skills/deploy.md"));
    assert!(written.contains("type: prompt"));
    assert!(written.contains("trigger: /deploy"));
    assert!(written.ends_with("Ship it.\n"));
}

#[test]
fn missing_source_fails_validation() {
    let fx = SkillTreeFixture::new();
    let err = engine(&fx, "cursor", Platform::Codex, options(Strategy::Overwrite))
        .prepare()
        .unwrap_err();
    assert!(matches!(err, SkillSyncError::ValidationFailed(_)));
}
