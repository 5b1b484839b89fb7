//! Integration tests for export and merge-import between two stores.

use chrono::{DateTime, Duration, TimeZone, Utc};
use deepwork_core::storage::{write_backup_file, KeyValueStore, SETTINGS_KEY};
use deepwork_core::{CoreError, Database, NewSession, SessionPatch, SettingsStore};
use proptest::prelude::*;
use serde_json::json;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 7, 0, 0).unwrap()
}

fn laptop() -> Database {
    let db = Database::open_memory().unwrap();
    for (day, minutes, rating) in [(0, 25, 4), (1, 50, 5), (2, 90, 3)] {
        db.add_session(&NewSession::new(base() + Duration::days(day), minutes, rating))
            .unwrap();
    }
    SettingsStore::new(&db).set("soundType", "ping").unwrap();
    db
}

#[test]
fn test_stale_backup_never_destroys_newer_data() {
    let db = laptop();
    let backup = serde_json::to_value(db.export(base()).unwrap()).unwrap();

    // Work continues after the backup: one new session, one edit, one delete.
    let newer = db
        .add_session(&NewSession::new(base() + Duration::days(3), 45, 2))
        .unwrap();
    let edited = db.all_sessions().unwrap()[1].id;
    db.update_session(
        edited,
        &SessionPatch {
            rating: None,
            notes: Some("kept".into()),
        },
    )
    .unwrap();

    let summary = db.import_merge(&backup).unwrap();
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.duplicates_skipped, 3);
    assert_eq!(summary.existing_kept, 4);
    assert!(db.get_session(newer).unwrap().is_some());
    assert_eq!(
        db.get_session(edited).unwrap().unwrap().notes.as_deref(),
        Some("kept")
    );
}

#[test]
fn test_restore_from_file_into_another_device() {
    let dir = tempfile::tempdir().unwrap();
    let source = laptop();
    let path = write_backup_file(dir.path(), &source.export(base()).unwrap()).unwrap();

    let phone = Database::open_memory().unwrap();
    phone
        .add_session(&NewSession::new(base() + Duration::days(10), 30, 4))
        .unwrap();
    phone
        .kv_set(SETTINGS_KEY, &json!({"volume": 20, "theme": "dark"}).to_string())
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let summary = phone.import_merge_str(&text).unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.existing_kept, 1);
    assert_eq!(phone.session_count().unwrap(), 4);

    let raw = SettingsStore::new(&phone).raw().unwrap();
    assert_eq!(raw["soundType"], "ping");
    assert_eq!(raw["theme"], "dark");
    assert_eq!(raw["volume"], 20);

    // A second restore of the same file is a no-op.
    let again = phone.import_merge_str(&text).unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.duplicates_skipped, 3);
}

#[test]
fn test_partial_failure_rolls_back() {
    let db = laptop();
    let before = db.all_sessions().unwrap();
    let doc = json!({
        "version": "1.0",
        "sessions": [
            {"startTime": "2030-01-01T00:00:00Z", "duration": 30, "rating": 4},
            {"startTime": "2030-01-02T00:00:00Z", "duration": 30, "rating": 0}
        ]
    });
    assert!(matches!(db.import_merge(&doc), Err(CoreError::InvalidFormat(_))));
    assert_eq!(db.all_sessions().unwrap(), before);
}

proptest! {
    #[test]
    fn prop_import_twice_adds_nothing_the_second_time(
        entries in prop::collection::vec((0i64..10_000, 1i64..240, 1i64..=5), 0..20)
    ) {
        let source = Database::open_memory().unwrap();
        for (offset, minutes, rating) in &entries {
            source
                .add_session(&NewSession::new(base() + Duration::minutes(*offset), *minutes, *rating))
                .unwrap();
        }
        let doc = serde_json::to_value(source.export(base()).unwrap()).unwrap();

        let target = Database::open_memory().unwrap();
        let first = target.import_merge(&doc).unwrap();
        let second = target.import_merge(&doc).unwrap();

        prop_assert_eq!(second.imported, 0);
        prop_assert_eq!(second.duplicates_skipped, entries.len());
        prop_assert_eq!(first.imported + first.duplicates_skipped, entries.len());
        prop_assert_eq!(target.session_count().unwrap() as usize, first.imported);
    }
}
