use chrono::{Local, TimeZone, Utc};
use fieldsync::core::{SyncEngine, SyncSettings};
use fieldsync::models::{
    ActivityInput, ActivityRecord, ActivityType, AttendanceRecord, CheckInInput, QueueRecord,
    RecordKind, VerifiedBy,
};
use fieldsync::remote::BatchResponse;
use std::sync::Arc;
use std::sync::atomic::Ordering;

mod common;
use common::{Harness, fast_settings, harness, harness_with, status};

fn queue_activity(h: &Harness, id: &str, palm: &str, worker: &str) {
    let date = Utc.with_ymd_and_hms(2026, 5, 4, 6, 0, 0).unwrap();
    let input = ActivityInput::new(palm, ActivityType::Harvesting, worker, date);
    let record = ActivityRecord::from_input(&input, id.to_string(), 1_000);
    h.store.put(&QueueRecord::from(record)).unwrap();
}

fn queue_check_in(h: &Harness, id: &str, employee: &str) {
    let at = Local
        .with_ymd_and_hms(2026, 5, 4, 7, 0, 0)
        .earliest()
        .unwrap()
        .timestamp_millis();
    let input = CheckInInput {
        employee_id: employee.to_string(),
        check_in_at: at,
        verified_by: VerifiedBy::Fingerprint,
    };
    let record = AttendanceRecord::from_input(&input, id.to_string(), at);
    h.store.put(&QueueRecord::from(record)).unwrap();
}

fn synced_ids(h: &Harness, kind: RecordKind) -> Vec<String> {
    h.store
        .list(kind)
        .unwrap()
        .into_iter()
        .filter(|r| r.is_synced())
        .map(|r| r.id().to_string())
        .collect()
}

#[tokio::test]
async fn test_offline_check_in_syncs_when_connectivity_returns() {
    let h = harness(false);
    let out = h
        .app
        .writer
        .check_in(CheckInInput {
            employee_id: "E1".into(),
            check_in_at: fieldsync::utils::time::now_millis(),
            verified_by: VerifiedBy::Fingerprint,
        })
        .await
        .unwrap();
    assert!(!out.synced);
    assert_eq!(h.app.coordinator.status().pending_count, 1);

    h.probe.set(true);
    let report = h.app.coordinator.sync().await.unwrap();

    assert_eq!(report.attendance.synced, 1);
    assert_eq!(report.attendance.failed, 0);
    let status = h.app.coordinator.status();
    assert_eq!(status.pending_count, 0);
    assert!(status.last_sync_time.is_some());
    assert!(h.store.get(RecordKind::Attendance, &out.id).unwrap().unwrap().is_synced());
}

#[tokio::test]
async fn test_unknown_worker_rejection_is_isolated() {
    let h = harness(true);
    queue_activity(&h, "a1", "RP-A1-00001", "W1");
    queue_activity(&h, "a2", "RP-A1-00001", "W-UNKNOWN");
    queue_activity(&h, "a3", "RP-A1-00002", "W2");
    h.remote.reject_id("a2", "Worker not found");

    let report = h.app.coordinator.sync().await.unwrap();

    assert_eq!(report.activities.synced, 2);
    assert_eq!(report.activities.failed, 1);
    assert!(report.activities.errors.iter().any(|e| e.contains("Worker not found")));
    assert_eq!(h.remote.batch_calls(), 1);

    let mut synced = synced_ids(&h, RecordKind::Activity);
    synced.sort();
    assert_eq!(synced, vec!["a1", "a3"]);
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 1);

    // The rejected record is retried on the next pass, and only it.
    let again = h.app.coordinator.sync().await.unwrap();
    assert_eq!(again.activities.failed, 1);
    let last = h.remote.activity_batches.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].id, "a2");
}

#[tokio::test]
async fn test_second_pass_sends_nothing() {
    let h = harness(true);
    for i in 0..3 {
        queue_activity(&h, &format!("a{}", i), "RP-A1-00001", "W1");
    }
    queue_check_in(&h, "t1", "E1");

    let first = h.app.coordinator.sync().await.unwrap();
    assert_eq!(first.total_synced(), 4);
    let calls = h.remote.batch_calls();

    let second = h.app.coordinator.sync().await.unwrap();
    assert_eq!(second.total_synced(), 0);
    assert_eq!(second.total_failed(), 0);
    assert_eq!(h.remote.batch_calls(), calls);
}

#[tokio::test]
async fn test_unreachable_sync_makes_no_calls() {
    let h = harness(false);
    queue_activity(&h, "a1", "RP-A1-00001", "W1");

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.total_synced(), 0);
    assert_eq!(report.total_failed(), 0);
    assert_eq!(h.remote.batch_calls(), 0);
    assert!(!h.app.coordinator.status().is_online);
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 1);
}

#[tokio::test]
async fn test_transient_batch_failure_is_retried() {
    let h = harness(true);
    queue_activity(&h, "a1", "RP-A1-00001", "W1");
    {
        let mut f = h.remote.batch_failures.lock().unwrap();
        f.push_back(status(503, "busy"));
        f.push_back(fieldsync::remote::RemoteError::Timeout);
    }

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.synced, 1);
    assert_eq!(h.remote.batch_calls(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_keep_records_pending() {
    let h = harness(true);
    queue_activity(&h, "a1", "RP-A1-00001", "W1");
    queue_activity(&h, "a2", "RP-A1-00001", "W1");
    h.remote.fail_batches(Some(status(500, "db down")));

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.synced, 0);
    assert_eq!(report.activities.failed, 2);
    assert_eq!(h.remote.batch_calls(), 3);
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 2);

    let meta = h.store.metadata().unwrap().unwrap();
    assert_eq!(meta.failed_count, 2);
    assert!(meta.last_sync_time.is_some());
}

#[tokio::test]
async fn test_client_error_batch_is_not_retried() {
    let h = harness(true);
    queue_activity(&h, "a1", "RP-A1-00001", "W1");
    h.remote.fail_batches(Some(status(400, "malformed")));

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.failed, 1);
    assert_eq!(h.remote.batch_calls(), 1);
}

#[tokio::test]
async fn test_lost_response_does_not_duplicate_remotely() {
    let h = harness(true);
    for i in 0..5 {
        queue_activity(&h, &format!("a{}", i), "RP-A1-00001", "W1");
    }
    h.remote.lose_next_response.store(true, Ordering::SeqCst);

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.synced, 5);
    // Sent twice, stored once: the client id is the dedupe key.
    assert_eq!(h.remote.batch_calls(), 2);
    assert_eq!(h.remote.unique_stored(), 5);
}

#[tokio::test]
async fn test_records_are_split_into_batches() {
    let mut settings = fast_settings();
    settings.sync = SyncSettings {
        batch_size: 4,
        ..settings.sync
    };
    let h = harness_with(true, settings);
    for i in 0..10 {
        queue_activity(&h, &format!("a{:02}", i), "RP-A1-00001", "W1");
    }
    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.synced, 10);
    let sizes: Vec<usize> = h
        .remote
        .activity_batches
        .lock()
        .unwrap()
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[tokio::test]
async fn test_both_kinds_sync_in_one_pass() {
    let h = harness(true);
    queue_activity(&h, "a1", "RP-A1-00001", "W1");
    queue_check_in(&h, "t1", "E1");
    queue_check_in(&h, "t2", "E2");

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.synced, 1);
    assert_eq!(report.attendance.synced, 2);
    assert!(report.success());

    let log = h
        .store
        .read(|tx| fieldsync::db::log::load_log(tx.conn()))
        .unwrap();
    assert!(log.iter().any(|e| e.operation == "sync_pass"));
}

#[tokio::test]
async fn test_record_changed_mid_pass_stays_pending() {
    let h = harness(true);
    queue_check_in(&h, "t1", "E1");
    *h.remote.batch_delay.lock().unwrap() = Some(std::time::Duration::from_millis(50));

    let coordinator = Arc::clone(&h.app.coordinator);
    let pass = tokio::spawn(async move { coordinator.sync().await });

    // Close the record while the batch is in flight.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    h.store
        .write(|tx| {
            let mut rec = tx
                .get(RecordKind::Attendance, "t1")?
                .and_then(|r| r.as_attendance().cloned())
                .unwrap();
            rec.close(rec.check_in_at + 3_600_000)?;
            tx.put(&QueueRecord::from(rec))
        })
        .unwrap();

    let report = pass.await.unwrap().unwrap();
    assert_eq!(report.attendance.synced, 0);
    assert_eq!(h.store.count_pending(RecordKind::Attendance).unwrap(), 1);

    *h.remote.batch_delay.lock().unwrap() = None;
    let next = h.app.coordinator.sync().await.unwrap();
    assert_eq!(next.attendance.synced, 1);
    let sent = h.remote.attendance_batches.lock().unwrap().last().cloned().unwrap();
    assert!(sent[0].check_out_at.is_some());
}

fn aggregate(success: bool, synced: u64, failed: u64, errors: &[&str]) -> BatchResponse {
    BatchResponse {
        success,
        synced,
        failed,
        errors: errors.iter().map(|e| e.to_string()).collect(),
        rejected: Vec::new(),
    }
}

#[tokio::test]
async fn test_unattributed_failure_keeps_record_pending() {
    let h = harness(true);
    queue_activity(&h, "a1", "RP-A1-00001", "W-UNKNOWN");
    h.remote
        .answer_batches(Some(aggregate(true, 0, 1, &["Worker not found"])));

    let engine = SyncEngine::new(h.store.clone(), h.remote.clone(), fast_settings().sync);
    let result = engine.sync_kind(RecordKind::Activity).await.unwrap();

    assert_eq!(result.synced, 0);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors, vec!["Worker not found".to_string()]);
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 1);
}

#[tokio::test]
async fn test_unsuccessful_batch_marks_nothing() {
    let h = harness(true);
    queue_check_in(&h, "t1", "E1");
    queue_check_in(&h, "t2", "E2");
    h.remote.answer_batches(Some(aggregate(false, 0, 0, &[])));

    let report = h.app.coordinator.sync().await.unwrap();

    assert_eq!(report.attendance.synced, 0);
    assert_eq!(report.attendance.failed, 2);
    assert!(!report.attendance.errors.is_empty());
    assert_eq!(h.store.count_pending(RecordKind::Attendance).unwrap(), 2);
}

#[tokio::test]
async fn test_mixed_unattributed_batch_is_resent_whole() {
    let h = harness(true);
    for i in 0..3 {
        queue_activity(&h, &format!("a{}", i), "RP-A1-00001", "W1");
    }
    h.remote
        .answer_batches(Some(aggregate(true, 2, 1, &["Worker not found"])));

    let report = h.app.coordinator.sync().await.unwrap();
    assert_eq!(report.activities.synced, 0);
    assert_eq!(report.activities.failed, 3);
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 3);
    let meta = h.store.metadata().unwrap().unwrap();
    assert_eq!(meta.pending_count, 3);

    h.remote.answer_batches(None);
    let next = h.app.coordinator.sync().await.unwrap();
    assert_eq!(next.activities.synced, 3);
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 0);
}
