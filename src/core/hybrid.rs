//! Write path: immediate remote write when reachable, local pending queue
//! otherwise.

use crate::core::connectivity::Connectivity;
use crate::core::status::SyncCoordinator;
use crate::db::LocalStore;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ActivityInput, ActivityRecord, AttendanceRecord, CheckInInput, QueueRecord, RecordKind,
    SyncState,
};
use crate::remote::{RemoteError, RemoteService};
use crate::utils::id::provisional_id;
use crate::utils::time::{local_day_bounds, now_millis};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub synced: bool,
    pub id: String,
}

impl WriteOutcome {
    fn of(record: &QueueRecord) -> Self {
        Self {
            synced: record.is_synced(),
            id: record.id().to_string(),
        }
    }
}

pub struct HybridWriter {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteService>,
    probe: Arc<dyn Connectivity>,
    coordinator: Arc<SyncCoordinator>,
    /// Attendance writes for one employee run one at a time, so the remote
    /// never sees a check-in that the local open-record check would refuse.
    employee_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// What to do after an immediate remote call.
enum Immediate<T> {
    Accepted(T),
    Deferred,
}

fn triage<T>(result: Result<T, RemoteError>) -> AppResult<Immediate<T>> {
    match result {
        Ok(value) => Ok(Immediate::Accepted(value)),
        Err(e) if e.is_client_error() => Err(AppError::Rejected(e.reason())),
        Err(e) => {
            warn!(error = %e, "immediate write failed, queueing locally");
            Ok(Immediate::Deferred)
        }
    }
}

impl HybridWriter {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteService>,
        probe: Arc<dyn Connectivity>,
        coordinator: Arc<SyncCoordinator>,
    ) -> Self {
        Self {
            store,
            remote,
            probe,
            coordinator,
            employee_locks: Mutex::new(HashMap::new()),
        }
    }

    fn employee_lock(&self, employee: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .employee_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(employee.to_string()).or_default())
    }

    async fn attempt<T, F, Fut>(&self, call: F) -> AppResult<Immediate<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        if !self.probe.is_reachable().await {
            return Ok(Immediate::Deferred);
        }
        triage(call().await)
    }

    #[instrument(skip_all, fields(palm = %input.palm_id, kind = %input.activity_type.as_str()))]
    pub async fn record_activity(&self, input: ActivityInput) -> AppResult<WriteOutcome> {
        input.validate()?;

        let mut record = ActivityRecord::from_input(&input, provisional_id(), now_millis());

        let immediate = self.attempt(|| self.remote.create_activity(&record)).await?;
        if let Immediate::Accepted(remote_id) = immediate {
            record.id = remote_id;
            record.sync_state = SyncState::Synced;
        }

        let record = QueueRecord::from(record);
        self.store.put(&record)?;
        self.finish(&record).await
    }

    #[instrument(skip_all, fields(employee = %input.employee_id))]
    pub async fn check_in(&self, input: CheckInInput) -> AppResult<WriteOutcome> {
        input.validate()?;
        let employee = input.employee_id.trim().to_string();
        let day = local_day_bounds(input.check_in_at)?;

        let lock = self.employee_lock(&employee);
        let turn = lock.lock().await;

        if self.store.read(|tx| tx.open_attendance(&employee, day))?.is_some() {
            return Err(AppError::AlreadyCheckedIn(employee));
        }

        let mut record = AttendanceRecord::from_input(&input, provisional_id(), now_millis());

        let immediate = self.attempt(|| self.remote.check_in(&record)).await?;
        if let Immediate::Accepted(remote_id) = immediate {
            record.id = remote_id;
            record.sync_state = SyncState::Synced;
        }

        let record = QueueRecord::from(record);
        self.store.write(|tx| {
            // Another check-in may have landed while the remote call ran.
            if tx.open_attendance(&employee, day)?.is_some() {
                return Err(AppError::AlreadyCheckedIn(employee.clone()));
            }
            tx.put(&record)
        })?;
        drop(turn);
        self.finish(&record).await
    }

    /// Close today's open attendance record for `employee_id`.
    ///
    /// A record that never reached the remote is closed locally and stays
    /// pending: the next bulk sync carries both times.
    #[instrument(skip(self))]
    pub async fn check_out(&self, employee_id: &str, check_out_at: i64) -> AppResult<WriteOutcome> {
        let employee = employee_id.trim().to_string();
        if employee.is_empty() {
            return Err(AppError::InvalidSubject("empty employee id".into()));
        }
        let day = local_day_bounds(check_out_at)?;

        let lock = self.employee_lock(&employee);
        let turn = lock.lock().await;

        let open = self
            .store
            .read(|tx| tx.open_attendance(&employee, day))?
            .ok_or_else(|| AppError::NoOpenCheckIn(employee.clone()))?;

        let mut closed = open.clone();
        closed.close(check_out_at)?;

        if open.sync_state.is_synced()
            && let Immediate::Accepted(remote) = self
                .attempt(|| self.remote.check_out(&employee, check_out_at, &open.id))
                .await?
        {
            closed.id = remote.id;
            closed.sync_state = SyncState::Synced;
        }

        let record = QueueRecord::from(closed);
        self.store.write(|tx| {
            let still_open = tx
                .get(RecordKind::Attendance, &open.id)?
                .and_then(|r| r.as_attendance().map(AttendanceRecord::is_open))
                .unwrap_or(false);
            if !still_open {
                return Err(AppError::NoOpenCheckIn(employee.clone()));
            }
            tx.rekey(&open.id, &record)
        })?;
        drop(turn);
        self.finish(&record).await
    }

    /// Today's attendance record for `employee_id`, open or closed.
    pub fn today_attendance(
        &self,
        employee_id: &str,
        at: i64,
    ) -> AppResult<Option<AttendanceRecord>> {
        let day = local_day_bounds(at)?;
        self.store
            .read(|tx| tx.attendance_in(employee_id.trim(), day))
    }

    async fn finish(&self, record: &QueueRecord) -> AppResult<WriteOutcome> {
        let outcome = WriteOutcome::of(record);
        info!(id = %outcome.id, synced = outcome.synced, kind = %record.kind(), "write stored");

        if let Err(e) = self.coordinator.update_status().await {
            warn!(error = %e, "status refresh failed");
        }
        if !outcome.synced {
            self.coordinator.spawn_background_sync();
        }
        Ok(outcome)
    }
}
