use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use walkdir::WalkDir;

use skillsync::backup::{BackupMetadata, BackupStore, CleanupOptions, select_for_cleanup};
use skillsync::core::{Platform, Scope, Skill, normalize_content};
use skillsync::parser::{PlatformParser, ScopedPath, TieredParser};
use skillsync::sync::{
    Destination, Strategy as SyncStrategy, SyncAction, SyncEngine, SyncOptions, plan,
};
use skillsync::test_utils::fixtures::{SkillTreeFixture, skill_markdown};

fn skill_name() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}".prop_map(|suffix| format!("skill-{suffix}"))
}

fn description() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|word| format!("Handles {word}"))
}

fn body() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z #]{0,12}", 0..8).prop_map(|lines| lines.join("\n"))
}

fn any_strategy() -> impl Strategy<Value = SyncStrategy> {
    prop::sample::select(SyncStrategy::all().to_vec())
}

fn dest() -> Destination {
    Destination::new(Platform::Cursor, Scope::User, "/home/u/.cursor")
}

fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let bytes = fs::read(entry.path()).unwrap();
            (entry.path().to_path_buf(), bytes)
        })
        .collect()
}

fn backup(id: &str, platform: Platform, hours_ago: i64) -> BackupMetadata {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    BackupMetadata {
        id: id.to_string(),
        platform,
        source_path: PathBuf::from("/home/u/.cursor"),
        storage_path: PathBuf::from(format!("/store/{}/{id}", platform.as_str())),
        size: 0,
        created_at: now - TimeDelta::hours(hours_ago),
        checksum: String::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_parse_emit_round_trip(
        name in skill_name(),
        description in description(),
        body in body(),
        platform in prop::sample::select(Platform::all().to_vec()),
    ) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(platform.config_dir_name());
        let path = platform.skill_file_path(&root, &name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let original = skill_markdown(&name, &description, &body);
        fs::write(&path, &original).unwrap();

        let report = PlatformParser::new(platform, &root, Scope::User).parse().unwrap();
        prop_assert_eq!(report.skills.len(), 1);
        let emitted = report.skills[0].emit().unwrap();
        prop_assert_eq!(
            emitted,
            skill_markdown(&name, &description, &normalize_content(&body))
        );
    }

    #[test]
    fn test_tiered_keeps_highest_scope(
        presence in prop::collection::vec(prop::collection::vec(any::<bool>(), 4), 4),
    ) {
        let names = ["alpha", "beta", "gamma", "delta"];
        let scopes = [Scope::Repo, Scope::User, Scope::Admin, Scope::System];
        let tmp = tempfile::tempdir().unwrap();

        let mut tiers = Vec::new();
        for (scope, present) in scopes.iter().zip(&presence) {
            let root = tmp.path().join(scope.as_str());
            fs::create_dir_all(root.join("skills")).unwrap();
            for (name, here) in names.iter().zip(present) {
                if *here {
                    let text = skill_markdown(name, scope.as_str(), "body\n");
                    fs::write(root.join("skills").join(format!("{name}.md")), text).unwrap();
                }
            }
            tiers.push(ScopedPath::new(*scope, root));
        }

        let report = TieredParser::new(Platform::Cursor, tiers).parse().unwrap();
        for (idx, name) in names.iter().enumerate() {
            let best = scopes
                .iter()
                .zip(&presence)
                .filter(|(_, present)| present[idx])
                .map(|(scope, _)| *scope)
                .max();
            let found: Vec<&Skill> = report.skills.iter().filter(|s| s.name == *name).collect();
            match best {
                Some(scope) => {
                    prop_assert_eq!(found.len(), 1);
                    prop_assert_eq!(found[0].scope, scope);
                    prop_assert_eq!(found[0].description.as_str(), scope.as_str());
                }
                None => prop_assert!(found.is_empty()),
            }
        }
    }

    // =========================================================================
    // Planning
    // =========================================================================

    #[test]
    fn test_identical_pairs_never_mutate(
        name in skill_name(),
        body in body(),
        strategy in any_strategy(),
    ) {
        let source = Skill::new(name.clone(), Platform::ClaudeCode, Scope::User)
            .with_description("same")
            .with_metadata("license", "MIT")
            .with_content(&body)
            .with_path(format!("/home/u/.claude/skills/{name}/SKILL.md"));
        let target = source.retarget(Platform::Cursor, Scope::User, dest().path_for(&name));

        let plan = plan(&[source], &[target], strategy, false, &dest());
        prop_assert_eq!(plan.items.len(), 1);
        prop_assert_eq!(plan.items[0].action, SyncAction::Skipped);
        prop_assert!(plan.items[0].write.is_none());
        prop_assert_eq!(plan.mutation_count(), 0);
    }

    #[test]
    fn test_empty_source_never_mutates_without_delete(
        names in prop::collection::btree_set(skill_name(), 1..6),
        strategy in any_strategy(),
    ) {
        let target: Vec<Skill> = names
            .iter()
            .map(|name| {
                Skill::new(name.clone(), Platform::Cursor, Scope::User)
                    .with_content("kept")
                    .with_path(dest().path_for(name))
            })
            .collect();

        let kept = plan(&[], &target, strategy, false, &dest());
        prop_assert_eq!(kept.mutation_count(), 0);
        prop_assert_eq!(kept.count(SyncAction::Skipped), names.len());

        let deleted = plan(&[], &target, strategy, true, &dest());
        prop_assert_eq!(deleted.count(SyncAction::Deleted), names.len());
    }

    // =========================================================================
    // Backups
    // =========================================================================

    #[test]
    fn test_cleanup_keeps_latest_per_platform(
        ages in prop::collection::vec((any::<bool>(), 0i64..2000), 0..16),
        keep in 0usize..5,
        older_than_hours in prop::option::of(0u64..1000),
    ) {
        let backups: Vec<BackupMetadata> = ages
            .iter()
            .enumerate()
            .map(|(idx, (cursor, hours))| {
                let platform = if *cursor { Platform::Cursor } else { Platform::Codex };
                backup(&format!("b{idx:02}"), platform, *hours)
            })
            .collect();
        let mut options = CleanupOptions::default().keep_latest(keep);
        if let Some(hours) = older_than_hours {
            options = options.older_than(Duration::from_secs(hours * 3600));
        }
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let removed = select_for_cleanup(&backups, &options, now).unwrap();

        for platform in [Platform::Cursor, Platform::Codex] {
            let total = backups.iter().filter(|b| b.platform == platform).count();
            let left = backups
                .iter()
                .filter(|b| b.platform == platform && !removed.contains(&b.id))
                .count();
            prop_assert!(left >= keep.max(1).min(total));
        }
    }
}

#[test]
fn test_dry_run_leaves_every_file_untouched() {
    for strategy in SyncStrategy::all() {
        let fx = SkillTreeFixture::new();
        let claude = fx.user_dir(Platform::ClaudeCode);
        let cursor = fx.user_dir(Platform::Cursor);
        fx.skill_dir_file(&claude, "alpha", "A", "new\n");
        fx.skill_dir_file(&claude, "beta", "B", "only in source\n");
        fx.cursor_skill(&cursor, "alpha", "A", "old\n");
        fx.cursor_skill(&cursor, "gamma", "C", "only in target\n");
        let before = snapshot_tree(fx.temp_dir.path());

        let ctx = fx.context();
        let options = SyncOptions {
            strategy: *strategy,
            dry_run: true,
            delete: true,
            ..SyncOptions::default()
        };
        let source = TieredParser::new(
            Platform::ClaudeCode,
            vec![ScopedPath::new(Scope::User, claude.clone())],
        );
        let engine = SyncEngine::new(source, ctx.destination(Platform::Cursor, Scope::User), options)
            .with_backup_store(ctx.backup_store());
        let result = engine.execute(engine.prepare().unwrap()).unwrap();
        assert!(result.dry_run);
        assert!(result.backup_id.is_none());

        assert_eq!(snapshot_tree(fx.temp_dir.path()), before, "strategy {strategy}");
    }
}

#[test]
fn test_snapshot_restore_is_byte_exact() {
    let fx = SkillTreeFixture::new();
    let cursor = fx.user_dir(Platform::Cursor);
    let files = vec![
        fx.cursor_skill(&cursor, "alpha", "A", "first\n"),
        fx.cursor_skill(&cursor, "beta", "B", "second\n\n  indented\n"),
        fx.write(&cursor.join("skills/raw.md"), "no frontmatter, no newline"),
    ];
    let before = snapshot_tree(&cursor);

    let store = BackupStore::new(fx.root.join("backups"));
    let meta = store.snapshot(Platform::Cursor, &files).unwrap();
    for file in &files {
        fs::write(file, "clobbered").unwrap();
    }

    store.restore(&meta.id).unwrap();
    assert_eq!(snapshot_tree(&cursor), before);
    assert!(store.verify(&meta.id).unwrap().is_ok());
}
