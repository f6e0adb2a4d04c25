use chrono::{TimeZone, Utc};
use fieldsync::core::{SyncEvent, SyncPhase, Transition};
use fieldsync::models::{ActivityInput, ActivityRecord, ActivityType, QueueRecord, RecordKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mod common;
use common::{Harness, harness};

fn queue_activity(h: &Harness, id: &str) {
    let date = Utc.with_ymd_and_hms(2026, 5, 4, 6, 0, 0).unwrap();
    let input = ActivityInput::new("RP-A1-00001", ActivityType::Weeding, "W1", date);
    let record = ActivityRecord::from_input(&input, id.to_string(), 1_000);
    h.store.put(&QueueRecord::from(record)).unwrap();
}

async fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

#[tokio::test]
async fn test_status_refresh_is_read_only() {
    let h = harness(true);
    queue_activity(&h, "a1");
    queue_activity(&h, "a2");

    let status = h.app.coordinator.update_status().await.unwrap();
    assert!(status.is_online);
    assert_eq!(status.pending_count, 2);
    assert_eq!(status.phase, SyncPhase::Idle);
    assert!(status.last_sync_time.is_none());
    assert!(h.store.metadata().unwrap().is_none());
    assert_eq!(h.remote.batch_calls(), 0);
}

#[tokio::test]
async fn test_sync_emits_idle_syncing_idle() {
    let h = harness(true);
    queue_activity(&h, "a1");
    let mut transitions = h.app.coordinator.on_transition();

    h.app.coordinator.sync().await.unwrap();

    assert_eq!(
        transitions.try_recv().unwrap(),
        Transition {
            from: SyncPhase::Idle,
            to: SyncPhase::Syncing
        }
    );
    assert_eq!(
        transitions.try_recv().unwrap(),
        Transition {
            from: SyncPhase::Syncing,
            to: SyncPhase::Idle
        }
    );
    assert!(transitions.try_recv().is_err());
    assert!(!h.app.coordinator.is_syncing());
}

#[tokio::test]
async fn test_unreachable_sync_emits_no_transition() {
    let h = harness(false);
    queue_activity(&h, "a1");
    let mut transitions = h.app.coordinator.on_transition();

    h.app.coordinator.sync().await.unwrap();
    assert!(transitions.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_sync_is_rejected_without_side_effects() {
    let h = harness(true);
    queue_activity(&h, "a1");
    *h.remote.batch_delay.lock().unwrap() = Some(Duration::from_millis(50));

    let coordinator = Arc::clone(&h.app.coordinator);
    let first = tokio::spawn(async move { coordinator.sync().await });

    assert!(wait_for(|| h.app.coordinator.is_syncing()).await);
    let second = h.app.coordinator.sync().await.unwrap();
    assert_eq!(second.total_synced(), 0);
    assert_eq!(second.total_failed(), 0);

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.activities.synced, 1);
    assert_eq!(h.remote.batch_calls(), 1);
}

#[tokio::test]
async fn test_silent_sync_skips_when_nothing_pending() {
    let h = harness(true);
    h.app.coordinator.try_silent_sync().await;
    assert_eq!(h.remote.batch_calls(), 0);
    assert!(h.app.coordinator.status().is_online);
}

#[tokio::test]
async fn test_silent_sync_swallows_remote_failure() {
    let h = harness(true);
    queue_activity(&h, "a1");
    h.remote.fail_batches(Some(common::status(502, "bad gateway")));

    h.app.coordinator.try_silent_sync().await;

    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 1);
    assert_eq!(h.app.coordinator.status().failed_count, 1);
}

#[tokio::test]
async fn test_online_event_triggers_sync() {
    let h = harness(false);
    queue_activity(&h, "a1");

    h.probe.set(true);
    h.app.coordinator.handle_event(SyncEvent::Online).await;

    assert!(h.link.is_up());
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 0);
}

#[tokio::test]
async fn test_offline_event_updates_status_only() {
    let h = harness(true);
    queue_activity(&h, "a1");
    h.probe.set(false);

    h.app.coordinator.handle_event(SyncEvent::Offline).await;

    assert!(!h.link.is_up());
    let status = h.app.coordinator.status();
    assert!(!status.is_online);
    assert_eq!(status.pending_count, 1);
    assert_eq!(h.remote.batch_calls(), 0);
}

#[tokio::test]
async fn test_visibility_event_triggers_sync() {
    let h = harness(true);
    queue_activity(&h, "a1");

    h.app
        .coordinator
        .handle_event(SyncEvent::VisibilityRegained)
        .await;
    assert_eq!(h.store.count_pending(RecordKind::Activity).unwrap(), 0);
}

#[tokio::test]
async fn test_run_loop_ticks_and_stops_on_close() {
    let h = harness(true);
    let (tx, rx) = mpsc::channel(4);
    let runner = tokio::spawn(Arc::clone(&h.app.coordinator).run(rx));

    // Written after the loop started: only the periodic tick can pick it up.
    queue_activity(&h, "a1");
    let store = Arc::clone(&h.store);
    assert!(wait_for(|| store.count_pending(RecordKind::Activity).unwrap() == 0).await);

    drop(tx);
    tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("loop stops when the event channel closes")
        .unwrap();
}

#[tokio::test]
async fn test_status_watch_receives_updates() {
    let h = harness(true);
    let mut rx = h.app.coordinator.subscribe();
    queue_activity(&h, "a1");

    h.app.coordinator.update_status().await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().pending_count, 1);
}
