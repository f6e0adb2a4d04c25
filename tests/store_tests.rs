use chrono::{TimeZone, Utc};
use fieldsync::db::LocalStore;
use fieldsync::errors::AppError;
use fieldsync::models::{
    ActivityInput, ActivityRecord, ActivityType, AttendanceRecord, CheckInInput, QueueRecord,
    RecordKind, SyncState, VerifiedBy,
};

use tempfile::TempDir;

fn activity(id: &str, palm: &str) -> QueueRecord {
    let date = Utc.with_ymd_and_hms(2026, 5, 2, 6, 0, 0).unwrap();
    let input = ActivityInput::new(palm, ActivityType::Pruning, "W1", date);
    ActivityRecord::from_input(&input, id.to_string(), 1_000).into()
}

fn attendance(id: &str, employee: &str, at: i64) -> QueueRecord {
    let input = CheckInInput {
        employee_id: employee.to_string(),
        check_in_at: at,
        verified_by: VerifiedBy::Pin,
    };
    AttendanceRecord::from_input(&input, id.to_string(), at).into()
}

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("queue.sqlite");

    {
        let store = LocalStore::open(&db_path).unwrap();
        store.put(&activity("a1", "RP-A1-00001")).unwrap();
        store.put(&attendance("t1", "E1", 1_700_000_000_000)).unwrap();
        store.close().unwrap();
    }

    let store = LocalStore::open(&db_path).unwrap();
    let a = store.get(RecordKind::Activity, "a1").unwrap().unwrap();
    assert_eq!(a.subject_key(), "RP-A1-00001");
    assert_eq!(a.sync_state(), SyncState::Pending);
    assert_eq!(store.count_pending(RecordKind::Attendance).unwrap(), 1);
}

#[test]
fn test_put_overwrites_same_id() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put(&activity("a1", "RP-A1-00001")).unwrap();
    store.put(&activity("a1", "RP-A1-00002")).unwrap();

    let all = store.list(RecordKind::Activity).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].subject_key(), "RP-A1-00002");
}

#[test]
fn test_lookup_by_subject() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put(&activity("a1", "RP-A1-00001")).unwrap();
    store.put(&activity("a2", "RP-A1-00001")).unwrap();
    store.put(&activity("a3", "RP-B2-00010")).unwrap();

    let hits = store
        .get_by_subject(RecordKind::Activity, "RP-A1-00001")
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(
        store
            .get_by_subject(RecordKind::Activity, "RP-Z9-00001")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_scan_unsynced_skips_synced_rows() {
    let store = LocalStore::open_in_memory().unwrap();
    for i in 0..250 {
        let mut r = activity(&format!("a{:04}", i), "RP-A1-00001");
        if i % 5 == 0 {
            r.set_sync_state(SyncState::Synced);
        }
        store.put(&r).unwrap();
    }

    let pending: Vec<QueueRecord> = store
        .scan_unsynced(RecordKind::Activity)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(pending.len(), 200);
    assert!(pending.iter().all(|r| !r.is_synced()));
    assert_eq!(store.count_pending(RecordKind::Activity).unwrap(), 200);
}

#[test]
fn test_kinds_are_independent() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put(&activity("x1", "RP-A1-00001")).unwrap();
    store.put(&attendance("x1", "E1", 1_700_000_000_000)).unwrap();

    assert_eq!(store.clear(RecordKind::Activity).unwrap(), 1);
    assert!(store.get(RecordKind::Attendance, "x1").unwrap().is_some());
    assert!(store.get(RecordKind::Activity, "x1").unwrap().is_none());
}

#[test]
fn test_read_transaction_refuses_writes() {
    let store = LocalStore::open_in_memory().unwrap();
    let err = store
        .read(|tx| tx.put(&activity("a1", "RP-A1-00001")))
        .unwrap_err();
    assert!(matches!(err, AppError::ReadOnlyTransaction));
    assert!(store.list(RecordKind::Activity).unwrap().is_empty());
}

#[test]
fn test_failed_write_transaction_rolls_back() {
    let store = LocalStore::open_in_memory().unwrap();
    let out: Result<(), AppError> = store.write(|tx| {
        tx.put(&activity("a1", "RP-A1-00001"))?;
        Err(AppError::Other("boom".into()))
    });
    assert!(out.is_err());
    assert!(store.get(RecordKind::Activity, "a1").unwrap().is_none());
}

#[test]
fn test_closed_store_fails_fast() {
    let store = LocalStore::open_in_memory().unwrap();
    store.close().unwrap();
    assert!(!store.is_open());
    assert!(matches!(
        store.put(&activity("a1", "RP-A1-00001")),
        Err(AppError::StoreClosed)
    ));
}
