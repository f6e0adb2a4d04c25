#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use async_trait::async_trait;
use fieldsync::core::{
    Connectivity, FieldSync, LinkState, RetryPolicy, Settings, SyncSettings, TriggerTiming,
};
use fieldsync::db::LocalStore;
use fieldsync::models::{ActivityRecord, AttendanceRecord, Palm};
use fieldsync::remote::wire::RemoteAttendance;
use fieldsync::remote::{BatchResponse, PalmPage, RejectedRecord, RemoteError, RemoteService};
use std::collections::{HashMap, HashSet, VecDeque};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn fsy() -> Command {
    cargo_bin_cmd!("fieldsync")
}

/// Unreachable API: connection refused on the discard port.
pub const OFFLINE_API: &str = "http://127.0.0.1:9/api";

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_fieldsync.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    fs::remove_file(format!("{}-wal", db_path)).ok();
    fs::remove_file(format!("{}-shm", db_path)).ok();
    db_path
}

pub fn status(code: u16, message: &str) -> RemoteError {
    RemoteError::Status {
        status: code,
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Connectivity stub
// ---------------------------------------------------------------------------

pub struct StaticProbe {
    reachable: AtomicBool,
    pub probes: AtomicU32,
}

impl StaticProbe {
    pub fn new(reachable: bool) -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(reachable),
            probes: AtomicU32::new(0),
        })
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for StaticProbe {
    async fn is_reachable(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Remote stub
// ---------------------------------------------------------------------------

/// Scriptable in-memory remote. Bulk sync dedupes on record id, like a
/// server honoring client ids.
#[derive(Default)]
pub struct MockRemote {
    next_id: AtomicU32,
    /// Returned by every immediate write while set.
    pub write_error: Mutex<Option<RemoteError>>,
    /// Consumed one per bulk call before any success.
    pub batch_failures: Mutex<VecDeque<RemoteError>>,
    /// Returned by every bulk call while set.
    pub batch_error: Mutex<Option<RemoteError>>,
    /// Accept the next bulk call, then pretend the response was lost.
    pub lose_next_response: AtomicBool,
    /// Ids the remote refuses inside an otherwise successful batch.
    pub reject: Mutex<HashMap<String, String>>,
    /// Optional delay inside bulk calls.
    pub batch_delay: Mutex<Option<Duration>>,
    /// Aggregate-only answer returned by bulk calls while set; nothing is stored.
    pub batch_response: Mutex<Option<BatchResponse>>,
    /// Optional delay inside immediate writes.
    pub write_delay: Mutex<Option<Duration>>,

    pub batch_calls: AtomicU32,
    pub write_calls: AtomicU32,
    pub activity_batches: Mutex<Vec<Vec<ActivityRecord>>>,
    pub attendance_batches: Mutex<Vec<Vec<AttendanceRecord>>>,
    pub stored_ids: Mutex<HashSet<String>>,
    pub created: Mutex<Vec<ActivityRecord>>,
    pub check_ins: Mutex<Vec<AttendanceRecord>>,
    pub check_outs: Mutex<Vec<(String, i64)>>,
    pub palms: Mutex<Vec<Palm>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, err: Option<RemoteError>) {
        *self.write_error.lock().unwrap() = err;
    }

    pub fn fail_batches(&self, err: Option<RemoteError>) {
        *self.batch_error.lock().unwrap() = err;
    }

    pub fn reject_id(&self, id: &str, reason: &str) {
        self.reject
            .lock()
            .unwrap()
            .insert(id.to_string(), reason.to_string());
    }

    pub fn answer_batches(&self, response: Option<BatchResponse>) {
        *self.batch_response.lock().unwrap() = response;
    }

    pub fn batch_calls(&self) -> u32 {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn unique_stored(&self) -> usize {
        self.stored_ids.lock().unwrap().len()
    }

    fn remote_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn immediate(&self) -> Result<(), RemoteError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.write_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        match self.write_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn bulk(&self, ids: Vec<String>) -> Result<BatchResponse, RemoteError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.batch_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Some(e) = self.batch_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        if let Some(e) = self.batch_error.lock().unwrap().clone() {
            return Err(e);
        }
        if let Some(response) = self.batch_response.lock().unwrap().clone() {
            return Ok(response);
        }

        let reject = self.reject.lock().unwrap().clone();
        let mut rejected = Vec::new();
        let mut stored = self.stored_ids.lock().unwrap();
        for id in ids {
            match reject.get(&id) {
                Some(reason) => rejected.push(RejectedRecord {
                    id,
                    error: reason.clone(),
                }),
                None => {
                    stored.insert(id);
                }
            }
        }
        drop(stored);

        if self.lose_next_response.swap(false, Ordering::SeqCst) {
            return Err(RemoteError::Timeout);
        }

        Ok(BatchResponse {
            success: rejected.is_empty(),
            synced: 0,
            failed: rejected.len() as u64,
            errors: rejected.iter().map(|r| r.error.clone()).collect(),
            rejected,
        })
    }
}

#[async_trait]
impl RemoteService for MockRemote {
    async fn create_activity(&self, record: &ActivityRecord) -> Result<String, RemoteError> {
        self.immediate().await?;
        self.created.lock().unwrap().push(record.clone());
        Ok(self.remote_id())
    }

    async fn check_in(&self, record: &AttendanceRecord) -> Result<String, RemoteError> {
        self.immediate().await?;
        self.check_ins.lock().unwrap().push(record.clone());
        Ok(self.remote_id())
    }

    async fn check_out(
        &self,
        employee_id: &str,
        check_out_at: i64,
        client_id: &str,
    ) -> Result<RemoteAttendance, RemoteError> {
        self.immediate().await?;
        self.check_outs
            .lock()
            .unwrap()
            .push((employee_id.to_string(), check_out_at));
        Ok(RemoteAttendance {
            id: client_id.to_string(),
            check_in: None,
            check_out: None,
        })
    }

    async fn sync_activities(&self, batch: &[ActivityRecord]) -> Result<BatchResponse, RemoteError> {
        self.activity_batches.lock().unwrap().push(batch.to_vec());
        self.bulk(batch.iter().map(|r| r.id.clone()).collect()).await
    }

    async fn sync_attendance(
        &self,
        batch: &[AttendanceRecord],
    ) -> Result<BatchResponse, RemoteError> {
        self.attendance_batches.lock().unwrap().push(batch.to_vec());
        self.bulk(batch.iter().map(|r| r.id.clone()).collect()).await
    }

    async fn fetch_palms(&self, page: u32, limit: u32) -> Result<PalmPage, RemoteError> {
        let palms = self.palms.lock().unwrap();
        let start = ((page - 1) * limit) as usize;
        let items: Vec<Palm> = palms.iter().skip(start).take(limit as usize).cloned().collect();
        Ok(PalmPage {
            has_more: start + items.len() < palms.len(),
            total: palms.len() as u64,
            items,
        })
    }

    async fn fetch_palm(&self, qr_code: &str) -> Result<Palm, RemoteError> {
        self.palms
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.qr_code == qr_code)
            .cloned()
            .ok_or_else(|| status(404, "Palm not found"))
    }
}

pub fn palm(qr: &str) -> Palm {
    Palm {
        id: format!("uuid-{}", qr),
        qr_code: qr.to_string(),
        block_id: "block-a1".into(),
        block_name: "Block A1".into(),
        block_code: "A1".into(),
        row_number: Some(1),
        column_number: Some(2),
        planting_date: None,
        variety: Some("Tenera".into()),
        status: "ACTIVE".into(),
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn fast_settings() -> Settings {
    Settings {
        sync: SyncSettings {
            batch_size: 50,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        },
        timing: TriggerTiming {
            interval: Duration::from_millis(50),
            online_settle: Duration::from_millis(5),
            visibility_settle: Duration::from_millis(5),
        },
        palm_page_size: 2,
    }
}

pub struct Harness {
    pub app: FieldSync,
    pub store: Arc<LocalStore>,
    pub remote: Arc<MockRemote>,
    pub probe: Arc<StaticProbe>,
    pub link: LinkState,
}

pub fn harness_with(reachable: bool, settings: Settings) -> Harness {
    let store = Arc::new(LocalStore::open_in_memory().expect("in-memory store"));
    let remote = MockRemote::new();
    let probe = StaticProbe::new(reachable);
    let link = LinkState::default();
    let app = FieldSync::new(
        Arc::clone(&store),
        remote.clone(),
        probe.clone(),
        link.clone(),
        settings,
    );
    Harness {
        app,
        store,
        remote,
        probe,
        link,
    }
}

pub fn harness(reachable: bool) -> Harness {
    harness_with(reachable, fast_settings())
}
