//! Pull and rebuild scenarios against in-memory collaborators.

use brewsync_engine::{
    ArchiveEntry, CursorStore, DocumentStore, ExportReader, MemoryCursor, MemorySource,
    MemoryStore, RebuildFlagPolicy, RebuildReason, ReplayStatus, ReplayWindow, Replayer,
    SyncCursor, SyncOptions, SyncReport, Synchronizer, Timestamp, WindowOverrides,
};
use chrono::{Duration, Local, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use tracing_test::traced_test;

const RED_ALE: &str = "2021-11-16_Reston Red Ale";
const HELLES: &str = "2021-11-18_Munich Helles";

/// Local wall-clock time, the frame archive dates are written in.
fn at(day: u32, hour: u32, minute: u32) -> Timestamp {
    Local
        .with_ymd_and_hms(2021, 11, day, hour, minute, 0)
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

fn fixtures() -> MemorySource {
    MemorySource::new()
        .with_file("Recipe.bsmx", include_str!("fixtures/bsm-two-folders.bsmx"))
        .with_file("Archive.bsmx", include_str!("fixtures/Archive.bsmx"))
        .with_file("red-ale.bsmx", include_str!("fixtures/red-ale.bsmx"))
        .with_file("red-ale-edit.bsmx", include_str!("fixtures/red-ale-edit.bsmx"))
        .with_file("helles.bsmx", include_str!("fixtures/helles.bsmx"))
}

fn recipe_file(name: &str) -> String {
    format!(
        "<Recipe><Name>Recipes</Name><Data><Recipe><F_R_NAME>{}</F_R_NAME></Recipe></Data></Recipe>",
        name
    )
}

fn synchronizer(
    source: MemorySource,
    cursor: SyncCursor,
    policy: RebuildFlagPolicy,
) -> Synchronizer<MemoryStore, MemoryCursor, MemorySource> {
    Synchronizer::new(
        MemoryStore::new(),
        MemoryCursor::with_committed(cursor),
        source,
        SyncOptions {
            rebuild_flag: policy,
            ..SyncOptions::default()
        },
    )
}

// ============================================================================
// Pull
// ============================================================================

#[test]
fn pull_replays_whole_archive() {
    let mut sync = synchronizer(fixtures(), SyncCursor::default(), RebuildFlagPolicy::ClearOnPull);

    let report = sync.pull(WindowOverrides::default()).unwrap();

    assert_eq!(report.outcome.status, ReplayStatus::Completed);
    assert_eq!(report.outcome.applied, vec![RED_ALE, HELLES, RED_ALE, HELLES]);
    assert_eq!(report.window, ReplayWindow::unbounded());

    let store = sync.store();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(RED_ALE).unwrap()["boil_time"], 75);
    assert_eq!(store.get(RED_ALE).unwrap()["folder_name"], "/Ales/");

    let cursor = sync.cursor().committed();
    assert_eq!(cursor.last_updated, Some(at(25, 18, 30)));
    assert_eq!(cursor.last_id.as_deref(), Some(HELLES));
    assert!(!cursor.rebuild);
}

#[test]
fn pull_resumes_from_cursor() {
    let cursor = SyncCursor {
        last_updated: Some(at(20, 0, 0)),
        last_id: Some(HELLES.into()),
        rebuild: false,
    };
    let mut sync = synchronizer(fixtures(), cursor, RebuildFlagPolicy::ClearOnPull);

    let report = sync.pull(WindowOverrides::default()).unwrap();

    // the edit of an unknown recipe stops replay before the delete
    assert_eq!(
        report.outcome.status,
        ReplayStatus::RebuildRequired(RebuildReason::Renamed {
            name: RED_ALE.into()
        })
    );
    assert_eq!(report.outcome.skipped, 2);
    assert!(report.outcome.applied.is_empty());
}

#[test]
fn pull_with_end_override() {
    let mut sync = synchronizer(fixtures(), SyncCursor::default(), RebuildFlagPolicy::ClearOnPull);

    let report = sync
        .pull(WindowOverrides {
            start: None,
            end: Some(at(18, 9, 0)),
        })
        .unwrap();

    assert_eq!(report.outcome.applied, vec![RED_ALE]);
    assert_eq!(sync.cursor().committed().last_updated, Some(at(16, 20, 15)));
}

#[test]
fn rebuild_flag_cleared_on_pull() {
    let source = fixtures().with_file(
        "Archive.bsmx",
        "<Archive><F_AR_ACTION>Paste</F_AR_ACTION><F_AR_NAME>Copy</F_AR_NAME>\
         <F_AR_FILE>copy.bsmx</F_AR_FILE><F_AR_DATE>2021-11-26</F_AR_DATE></Archive>",
    );
    let mut sync = synchronizer(source, SyncCursor::default(), RebuildFlagPolicy::ClearOnPull);

    let report = sync.pull(WindowOverrides::default()).unwrap();

    assert!(report.outcome.rebuild_requested());
    assert!(!report.rebuild_pending);
    assert!(!sync.cursor().committed().rebuild);
}

#[test]
fn rebuild_flag_kept_until_rebuild() {
    let source = fixtures().with_file(
        "Archive.bsmx",
        "<Archive><F_AR_ACTION>Paste</F_AR_ACTION><F_AR_NAME>Copy</F_AR_NAME>\
         <F_AR_FILE>copy.bsmx</F_AR_FILE><F_AR_DATE>2021-11-26</F_AR_DATE></Archive>",
    );
    let mut sync = synchronizer(source, SyncCursor::default(), RebuildFlagPolicy::KeepUntilRebuild);

    let report = sync.pull(WindowOverrides::default()).unwrap();
    assert!(report.rebuild_pending);
    assert!(sync.cursor().committed().rebuild);

    let report = sync.sync(at(27, 0, 0), WindowOverrides::default()).unwrap();
    assert!(matches!(report, SyncReport::Rebuild(_)));
    assert!(!sync.cursor().committed().rebuild);
}

// ============================================================================
// Replay Scenarios
// ============================================================================

#[test]
fn add_then_edit_of_absent_recipe_requests_rebuild() {
    let reader = ExportReader::new(
        MemorySource::new()
            .with_file("a.bsmx", recipe_file("A"))
            .with_file("b.bsmx", recipe_file("B"))
            .with_file("c.bsmx", recipe_file("C")),
    );
    let mut store = MemoryStore::new();
    let mut cursor = MemoryCursor::new();
    let entries = vec![
        ArchiveEntry::new("Add Recipe", "A", "a.bsmx", at(1, 0, 0)),
        ArchiveEntry::new("Edit", "B", "b.bsmx", at(2, 0, 0)),
        ArchiveEntry::new("Add Recipe", "C", "c.bsmx", at(3, 0, 0)),
    ];

    let outcome = Replayer::new(&mut store, &mut cursor, &reader)
        .replay(&entries, &ReplayWindow::unbounded())
        .unwrap();

    assert!(outcome.rebuild_requested());
    assert_eq!(store.ids().collect::<Vec<_>>(), vec!["A"]);
    assert!(cursor.committed().rebuild);
}

#[test]
fn delete_touches_only_named_recipe() {
    let reader = ExportReader::new(MemorySource::new());
    let mut store = MemoryStore::new();
    for id in ["X", "Y", "Z"] {
        store.upsert(id, json!({"_id": id})).unwrap();
    }
    let mut cursor = MemoryCursor::new();
    let entries = vec![ArchiveEntry::new("Delete/Cut", "X", "ignored.bsmx", at(1, 0, 0))];

    Replayer::new(&mut store, &mut cursor, &reader)
        .replay(&entries, &ReplayWindow::unbounded())
        .unwrap();

    assert_eq!(store.find_one("X").unwrap(), None);
    assert_eq!(store.find_one("Y").unwrap(), Some(json!({"_id": "Y"})));
    assert_eq!(store.find_one("Z").unwrap(), Some(json!({"_id": "Z"})));
}

#[test]
fn paste_anywhere_requests_rebuild() {
    for position in 0..3 {
        let reader = ExportReader::new(MemorySource::new().with_file("a.bsmx", recipe_file("A")));
        let mut store = MemoryStore::new();
        let mut cursor = MemoryCursor::new();
        let mut entries: Vec<_> = (0..3)
            .map(|i| ArchiveEntry::new("Add Recipe", "A", "a.bsmx", at(1, i, 0)))
            .collect();
        entries[position] = ArchiveEntry::new("Paste", "A", "a.bsmx", at(1, position as u32, 0));

        let outcome = Replayer::new(&mut store, &mut cursor, &reader)
            .replay(&entries, &ReplayWindow::unbounded())
            .unwrap();

        assert_eq!(
            outcome.status,
            ReplayStatus::RebuildRequired(RebuildReason::Paste { name: "A".into() })
        );
        assert_eq!(outcome.applied.len(), position);
    }
}

proptest! {
    #[test]
    fn cursor_lands_on_last_applied_entry(count in 1usize..12) {
        let mut source = MemorySource::new();
        for i in 0..count {
            source.insert(format!("r{}.bsmx", i), recipe_file(&format!("R{}", i)));
        }
        let reader = ExportReader::new(source);
        let start = at(1, 0, 0);
        let entries: Vec<_> = (0..count)
            .map(|i| {
                ArchiveEntry::new(
                    "Add Recipe",
                    format!("R{}", i),
                    format!("r{}.bsmx", i),
                    start + Duration::hours(i as i64),
                )
            })
            .collect();
        let mut store = MemoryStore::new();
        let mut cursor = MemoryCursor::new();

        Replayer::new(&mut store, &mut cursor, &reader)
            .replay(&entries, &ReplayWindow::unbounded())
            .unwrap();

        let last = entries.last().unwrap();
        prop_assert_eq!(cursor.committed().last_updated, Some(last.date));
        prop_assert_eq!(cursor.committed().last_id.clone(), Some(last.name.clone()));
        prop_assert_eq!(cursor.commit_count(), count);
        prop_assert_eq!(store.len(), count);
    }
}

// ============================================================================
// Rebuild
// ============================================================================

#[test]
fn rebuild_matches_export() {
    let mut sync = synchronizer(fixtures(), SyncCursor::default(), RebuildFlagPolicy::ClearOnPull);
    sync.pull(WindowOverrides::default()).unwrap();

    let report = sync.rebuild(at(30, 12, 0)).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.stored, 2);
    assert!(report.is_consistent());
    assert_eq!(sync.store().get(RED_ALE).unwrap()["boil_time"], 60);

    let filter = json!({"folder_name": "/Lagers/"});
    let lagers = sync.store().find(filter.as_object().unwrap()).unwrap();
    assert_eq!(lagers.len(), 1);
    assert_eq!(lagers[0]["_id"], HELLES);

    let cursor = sync.cursor().get().unwrap();
    assert_eq!(cursor.last_id.as_deref(), Some(HELLES));
    assert_eq!(cursor.last_updated, Some(at(30, 12, 0)));
}

#[test]
#[traced_test]
fn rebuild_count_mismatch_is_logged() {
    let export = "<Selections><Name>Recipes</Name><Data>\
        <Recipe><F_R_NAME>Twin</F_R_NAME></Recipe>\
        <Recipe><F_R_NAME>Twin</F_R_NAME></Recipe>\
        <Recipe><F_R_NAME>Single</F_R_NAME></Recipe>\
        </Data></Selections>";
    let source = MemorySource::new().with_file("Recipe.bsmx", export);
    let mut sync = synchronizer(source, SyncCursor::default(), RebuildFlagPolicy::ClearOnPull);

    let report = sync.rebuild(at(30, 12, 0)).unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.stored, 2);
    assert!(logs_contain("discrepancies found"));
}

#[test]
fn rebuild_of_missing_export_empties_store() {
    let mut sync = synchronizer(MemorySource::new(), SyncCursor::default(), RebuildFlagPolicy::ClearOnPull);

    let report = sync.rebuild(at(30, 12, 0)).unwrap();

    assert_eq!(report.processed, 0);
    assert!(sync.store().is_empty());
    assert_eq!(sync.cursor().committed(), &SyncCursor::default());
}
