//! E2E Scenario: backups taken by sync, then listed, verified, restored
//! and pruned.

use std::fs;

use skillsync::backup::{CleanupOptions, ListFilter};
use skillsync::core::{Platform, Scope};
use skillsync::error::SkillSyncError;
use skillsync::sync::{Choice, ScriptedResolver, Strategy, SyncEngine, SyncOptions, SyncSpec};
use skillsync::test_utils::fixtures::SkillTreeFixture;

// ============================================================================
// Helpers
// ============================================================================

/// Overwrite `cursor:user` from Claude Code with `body`, taking a backup.
fn sync_body(fx: &SkillTreeFixture, body: &str, cleanup: Option<CleanupOptions>) -> Option<String> {
    fx.skill_dir_file(&fx.user_dir(Platform::ClaudeCode), "alpha", "A", body);
    let ctx = fx.context();
    let spec: SyncSpec = "claudecode".parse().unwrap();
    let options = SyncOptions {
        strategy: Strategy::Overwrite,
        ..SyncOptions::default()
    };
    let mut engine = SyncEngine::new(
        ctx.source_parser(&spec),
        ctx.destination(Platform::Cursor, Scope::User),
        options,
    )
    .with_backup_store(ctx.backup_store());
    if let Some(cleanup) = cleanup {
        engine = engine.with_auto_cleanup(cleanup);
    }
    engine
        .run(&mut ScriptedResolver::always(Choice::Skip))
        .unwrap()
        .backup_id
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn created_only_sync_takes_no_backup() {
    let fx = SkillTreeFixture::new();
    assert!(sync_body(&fx, "v1\n", None).is_none());
    assert!(fx.context().backup_store().list(&ListFilter::default()).unwrap().is_empty());
}

#[test]
fn overwrite_then_restore_round_trip() {
    let fx = SkillTreeFixture::new();
    let target = fx.cursor_skill(&fx.user_dir(Platform::Cursor), "alpha", "A", "v1\n");
    let original = fs::read(&target).unwrap();

    let id = sync_body(&fx, "v2\n", None).expect("backup taken");
    assert!(fx.read(&target).ends_with("v2\n"));

    let store = fx.context().backup_store();
    let listed = store.list(&ListFilter::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].platform, Platform::Cursor);

    assert!(store.verify(&id).unwrap().is_ok());
    let restored = store.restore(&id).unwrap();
    assert_eq!(restored, vec![target.clone()]);
    assert_eq!(fs::read(&target).unwrap(), original);
}

#[test]
fn tampered_backup_refuses_restore() {
    let fx = SkillTreeFixture::new();
    let target = fx.cursor_skill(&fx.user_dir(Platform::Cursor), "alpha", "A", "v1\n");
    let id = sync_body(&fx, "v2\n", None).unwrap();

    let store = fx.context().backup_store();
    let record = store.get(&id).unwrap();
    let copy = record
        .metadata
        .storage_path
        .join(&record.files[0].relative_path);
    fs::write(&copy, "tampered").unwrap();

    assert!(!store.verify(&id).unwrap().is_ok());
    let err = store.restore(&id).unwrap_err();
    assert!(matches!(err, SkillSyncError::BackupCorrupt { .. }));
    assert!(fx.read(&target).ends_with("v2\n"));
}

#[test]
fn auto_cleanup_keeps_latest() {
    let fx = SkillTreeFixture::new();
    fx.cursor_skill(&fx.user_dir(Platform::Cursor), "alpha", "A", "v0\n");
    let keep_one = CleanupOptions::default().keep_latest(1);

    let mut last = None;
    for body in ["v1\n", "v2\n", "v3\n"] {
        last = sync_body(&fx, body, Some(keep_one.clone()));
    }

    let listed = fx
        .context()
        .backup_store()
        .list(&ListFilter::default())
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(Some(listed[0].id.clone()), last);
}

#[test]
fn list_filters_by_platform() {
    let fx = SkillTreeFixture::new();
    fx.cursor_skill(&fx.user_dir(Platform::Cursor), "alpha", "A", "v0\n");
    sync_body(&fx, "v1\n", None).unwrap();

    let store = fx.context().backup_store();
    let codex = ListFilter {
        platform: Some(Platform::Codex),
        ..ListFilter::default()
    };
    assert!(store.list(&codex).unwrap().is_empty());
    let cursor = ListFilter {
        platform: Some(Platform::Cursor),
        ..ListFilter::default()
    };
    assert_eq!(store.list(&cursor).unwrap().len(), 1);
}
