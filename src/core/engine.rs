//! Batch synchronization of the local queues.
//!
//! A pass materializes the pending set of one kind, uploads it in fixed-size
//! batches with retry, and marks accepted records synced in a fresh write
//! transaction per batch. Remote failures are counted, never raised; only
//! local store failures escape.

use crate::core::retry::{RetryPolicy, retry_with_backoff};
use crate::db::LocalStore;
use crate::errors::AppResult;
use crate::models::{
    ActivityRecord, AttendanceRecord, QueueRecord, RecordKind, SyncMetadata,
};
use crate::remote::{BatchResponse, RemoteError, RemoteService};
use crate::utils::time::now_millis;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub synced: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl SyncResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub activities: SyncResult,
    pub attendance: SyncResult,
}

impl SyncReport {
    pub fn total_synced(&self) -> u64 {
        self.activities.synced + self.attendance.synced
    }

    pub fn total_failed(&self) -> u64 {
        self.activities.failed + self.attendance.failed
    }

    pub fn success(&self) -> bool {
        self.activities.success() && self.attendance.success()
    }

    pub fn errors(&self) -> impl Iterator<Item = &String> {
        self.activities.errors.iter().chain(&self.attendance.errors)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            retry: RetryPolicy::default(),
        }
    }
}

enum Batch {
    Activities(Vec<ActivityRecord>),
    Attendance(Vec<AttendanceRecord>),
}

impl Batch {
    fn of(kind: RecordKind, records: &[QueueRecord]) -> Self {
        match kind {
            RecordKind::Activity => Batch::Activities(
                records.iter().filter_map(|r| r.as_activity().cloned()).collect(),
            ),
            RecordKind::Attendance => Batch::Attendance(
                records
                    .iter()
                    .filter_map(|r| r.as_attendance().cloned())
                    .collect(),
            ),
        }
    }
}

pub struct SyncEngine {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteService>,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteService>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            remote,
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Upload every pending record of one kind.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn sync_kind(&self, kind: RecordKind) -> AppResult<SyncResult> {
        // One read transaction: records written after this point wait for
        // the next pass.
        let pending = self.store.read(|tx| tx.unsynced(kind))?;

        let mut result = SyncResult::default();
        if pending.is_empty() {
            return Ok(result);
        }

        info!(count = pending.len(), "syncing pending records");

        let batch_size = self.settings.batch_size.max(1);
        for (index, chunk) in pending.chunks(batch_size).enumerate() {
            let batch = Batch::of(kind, chunk);
            let label = format!("{} batch {}", kind.label(), index + 1);

            let batch = &batch;
            let outcome =
                retry_with_backoff(&self.settings.retry, &label, move || self.send(batch)).await;

            match outcome {
                Ok(response) => self.apply(kind, chunk, &response, &mut result)?,
                Err(e) => {
                    error!(batch = index + 1, error = %e, "batch failed");
                    result.failed += chunk.len() as u64;
                    result.errors.push(format!("Batch {}: {}", index + 1, e));
                }
            }
        }

        Ok(result)
    }

    async fn send(&self, batch: &Batch) -> Result<BatchResponse, RemoteError> {
        match batch {
            Batch::Activities(records) => self.remote.sync_activities(records).await,
            Batch::Attendance(records) => self.remote.sync_attendance(records).await,
        }
    }

    /// Mark the accepted records of one batch synced.
    ///
    /// Records named in `rejected` stay pending. A record that changed
    /// locally since it was read (for example a check-out landing mid-pass)
    /// is left pending too, so the newer content goes out next pass.
    ///
    /// A response that reports failures without naming the records cannot be
    /// applied per record: the whole batch stays pending and is resent next
    /// pass, relying on the client ids for remote dedupe.
    fn apply(
        &self,
        kind: RecordKind,
        sent: &[QueueRecord],
        response: &BatchResponse,
        result: &mut SyncResult,
    ) -> AppResult<()> {
        let rejected: HashMap<&str, &str> = response
            .rejected
            .iter()
            .map(|r| (r.id.as_str(), r.error.as_str()))
            .collect();

        if rejected.is_empty() && (!response.success || response.failed > 0) {
            warn!(
                sent = sent.len(),
                failed = response.failed,
                success = response.success,
                "remote reported failures without naming records; keeping batch pending"
            );
            result.failed += sent.len() as u64;
            if response.errors.is_empty() {
                result.errors.push(format!(
                    "{} {} record(s) not confirmed by remote",
                    sent.len(),
                    kind.label()
                ));
            } else {
                result.errors.extend(response.errors.iter().cloned());
            }
            return Ok(());
        }

        let marked = self.store.write(|tx| {
            let mut marked = 0u64;
            for record in sent {
                if rejected.contains_key(record.id()) {
                    continue;
                }
                let unchanged = tx.get(kind, record.id())?.as_ref() == Some(record);
                if unchanged && tx.mark_synced(kind, record.id())? {
                    marked += 1;
                }
            }
            Ok(marked)
        })?;

        for record in sent {
            if let Some(reason) = rejected.get(record.id()) {
                result.failed += 1;
                result.errors.push(format!("{}: {}", record.id(), reason));
            }
        }
        result.synced += marked;
        Ok(())
    }

    /// Sync both kinds concurrently and record the pass in the metadata row.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> AppResult<SyncReport> {
        let (activities, attendance) = tokio::join!(
            self.sync_kind(RecordKind::Activity),
            self.sync_kind(RecordKind::Attendance)
        );
        let report = SyncReport {
            activities: activities?,
            attendance: attendance?,
        };

        let failed = report.total_failed();
        let meta = SyncMetadata {
            last_sync_time: Some(now_millis()),
            pending_count: failed,
            failed_count: failed,
        };
        let summary = format!(
            "activities {}/{} attendance {}/{} (synced/failed)",
            report.activities.synced,
            report.activities.failed,
            report.attendance.synced,
            report.attendance.failed
        );

        self.store.write(|tx| {
            tx.save_metadata(&meta)?;
            tx.log("sync_pass", "", &summary)
        })?;

        info!(
            synced = report.total_synced(),
            failed,
            "sync pass complete"
        );
        Ok(report)
    }
}
