//! Durable local store: one SQLite file holding the activity and attendance
//! queues, the sync metadata row and the palm cache.
//!
//! The store is an explicitly constructed object (`open` / `close`) that is
//! shared by reference (`Arc<LocalStore>`). Every operation runs inside a
//! short read-only or read-write transaction; the connection mutex is only
//! held for the duration of that closure and never across an `.await`.

use crate::db::migrate::run_pending_migrations;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AttendanceRecord, CachedPalm, Palm, QueueRecord, RecordKind, SyncMetadata, SyncState,
};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const SCAN_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

pub struct LocalStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl LocalStore {
    /// Open (creating if needed) the store at `path` and run pending migrations.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::prepare(conn, path)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, PathBuf::from(":memory:"))
    }

    fn prepare(conn: Connection, path: PathBuf) -> AppResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        run_pending_migrations(&conn, false)?;
        debug!(path = %path.display(), "local store opened");

        Ok(Self {
            path,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Close the underlying connection. Later operations fail with `StoreClosed`.
    pub fn close(&self) -> AppResult<()> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| AppError::Db(e))?;
            debug!(path = %self.path.display(), "local store closed");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Other("local store lock poisoned".into()))
    }

    fn run<T, F>(&self, mode: TxMode, func: F) -> AppResult<T>
    where
        F: FnOnce(&StoreTx<'_>) -> AppResult<T>,
    {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(AppError::StoreClosed)?;

        let behavior = match mode {
            TxMode::ReadOnly => TransactionBehavior::Deferred,
            TxMode::ReadWrite => TransactionBehavior::Immediate,
        };
        let tx = conn.transaction_with_behavior(behavior)?;

        // An error drops `tx`, which rolls every write back.
        let out = func(&StoreTx { conn: &tx, mode })?;

        match mode {
            TxMode::ReadOnly => tx.rollback()?,
            TxMode::ReadWrite => tx.commit()?,
        }
        Ok(out)
    }

    /// Run `func` in a read-only transaction.
    pub fn read<T, F>(&self, func: F) -> AppResult<T>
    where
        F: FnOnce(&StoreTx<'_>) -> AppResult<T>,
    {
        self.run(TxMode::ReadOnly, func)
    }

    /// Run `func` in a read-write transaction; all its writes commit together.
    pub fn write<T, F>(&self, func: F) -> AppResult<T>
    where
        F: FnOnce(&StoreTx<'_>) -> AppResult<T>,
    {
        self.run(TxMode::ReadWrite, func)
    }

    // -----------------------------------------------------------------------
    // Single-step conveniences
    // -----------------------------------------------------------------------

    pub fn put(&self, record: &QueueRecord) -> AppResult<()> {
        self.write(|tx| tx.put(record))
    }

    pub fn get(&self, kind: RecordKind, id: &str) -> AppResult<Option<QueueRecord>> {
        self.read(|tx| tx.get(kind, id))
    }

    pub fn get_by_subject(&self, kind: RecordKind, subject: &str) -> AppResult<Vec<QueueRecord>> {
        self.read(|tx| tx.by_subject(kind, subject))
    }

    /// Lazy sequence over pending records of `kind`, fetched page by page.
    pub fn scan_unsynced(&self, kind: RecordKind) -> UnsyncedScan<'_> {
        UnsyncedScan {
            store: self,
            kind,
            after: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    pub fn clear(&self, kind: RecordKind) -> AppResult<usize> {
        self.write(|tx| tx.clear(kind))
    }

    pub fn count_pending(&self, kind: RecordKind) -> AppResult<u64> {
        self.read(|tx| tx.count(kind, SyncState::Pending))
    }

    pub fn list(&self, kind: RecordKind) -> AppResult<Vec<QueueRecord>> {
        self.read(|tx| tx.all(kind))
    }

    pub fn metadata(&self) -> AppResult<Option<SyncMetadata>> {
        self.read(|tx| tx.metadata())
    }
}

/// Handle passed to transaction closures.
pub struct StoreTx<'a> {
    conn: &'a Connection,
    mode: TxMode,
}

impl StoreTx<'_> {
    pub fn mode(&self) -> TxMode {
        self.mode
    }

    pub fn conn(&self) -> &Connection {
        self.conn
    }

    fn writable(&self) -> AppResult<()> {
        match self.mode {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(AppError::ReadOnlyTransaction),
        }
    }

    pub fn put(&self, record: &QueueRecord) -> AppResult<()> {
        self.writable()?;
        queries::upsert_record(self.conn, record)
    }

    pub fn get(&self, kind: RecordKind, id: &str) -> AppResult<Option<QueueRecord>> {
        queries::load_record(self.conn, kind, id)
    }

    pub fn by_subject(&self, kind: RecordKind, subject: &str) -> AppResult<Vec<QueueRecord>> {
        queries::load_by_subject(self.conn, kind, subject)
    }

    pub fn all(&self, kind: RecordKind) -> AppResult<Vec<QueueRecord>> {
        queries::load_all(self.conn, kind)
    }

    pub fn pending_page(
        &self,
        kind: RecordKind,
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<QueueRecord>> {
        queries::load_page_by_state(self.conn, kind, SyncState::Pending, after, limit)
    }

    /// Every pending record of `kind`, paged through the index inside this
    /// one transaction so the result is a consistent snapshot.
    pub fn unsynced(&self, kind: RecordKind) -> AppResult<Vec<QueueRecord>> {
        let mut all = Vec::new();
        loop {
            let after = all.last().map(|r: &QueueRecord| r.id().to_string());
            let page = self.pending_page(kind, after.as_deref(), SCAN_PAGE_SIZE)?;
            let short = page.len() < SCAN_PAGE_SIZE;
            all.extend(page);
            if short {
                return Ok(all);
            }
        }
    }

    pub fn count(&self, kind: RecordKind, state: SyncState) -> AppResult<u64> {
        queries::count_by_state(self.conn, kind, state)
    }

    /// Flip pending → synced. Already-synced ids are left alone.
    pub fn mark_synced(&self, kind: RecordKind, id: &str) -> AppResult<bool> {
        self.writable()?;
        Ok(queries::mark_synced(self.conn, kind, id)? > 0)
    }

    pub fn delete(&self, kind: RecordKind, id: &str) -> AppResult<bool> {
        self.writable()?;
        Ok(queries::delete_record(self.conn, kind, id)? > 0)
    }

    /// Store `record` under its (new) id and drop the row kept under `old_id`.
    pub fn rekey(&self, old_id: &str, record: &QueueRecord) -> AppResult<()> {
        self.writable()?;
        if old_id != record.id() {
            queries::delete_record(self.conn, record.kind(), old_id)?;
        }
        queries::upsert_record(self.conn, record)
    }

    pub fn clear(&self, kind: RecordKind) -> AppResult<usize> {
        self.writable()?;
        queries::clear_kind(self.conn, kind)
    }

    pub fn open_attendance(
        &self,
        employee_id: &str,
        day: (i64, i64),
    ) -> AppResult<Option<AttendanceRecord>> {
        queries::find_open_attendance(self.conn, employee_id, day.0, day.1)
    }

    pub fn attendance_in(
        &self,
        employee_id: &str,
        day: (i64, i64),
    ) -> AppResult<Option<AttendanceRecord>> {
        queries::find_attendance_in(self.conn, employee_id, day.0, day.1)
    }

    pub fn metadata(&self) -> AppResult<Option<SyncMetadata>> {
        queries::load_metadata(self.conn)
    }

    pub fn save_metadata(&self, meta: &SyncMetadata) -> AppResult<()> {
        self.writable()?;
        queries::save_metadata(self.conn, meta)
    }

    /// Append a line to the internal audit log.
    pub fn log(&self, operation: &str, target: &str, message: &str) -> AppResult<()> {
        self.writable()?;
        crate::db::log::ttlog(self.conn, operation, target, message)
    }

    pub fn put_palm(&self, palm: &Palm, cached_at: i64) -> AppResult<()> {
        self.writable()?;
        queries::upsert_palm(self.conn, palm, cached_at)
    }

    pub fn palm(&self, qr_code: &str) -> AppResult<Option<CachedPalm>> {
        queries::load_palm(self.conn, qr_code)
    }

    pub fn palm_count(&self) -> AppResult<u64> {
        queries::count_palms(self.conn)
    }

    pub fn clear_palms(&self) -> AppResult<usize> {
        self.writable()?;
        queries::clear_palms(self.conn)
    }
}

/// Keyset-paginated walk of the `(sync_state, id)` index.
///
/// Each page is read in its own read-only transaction. Records that turn
/// synced while the walk is in progress are simply not returned; a new call
/// to `scan_unsynced` starts over from the beginning.
pub struct UnsyncedScan<'s> {
    store: &'s LocalStore,
    kind: RecordKind,
    after: Option<String>,
    buffer: VecDeque<QueueRecord>,
    done: bool,
}

impl Iterator for UnsyncedScan<'_> {
    type Item = AppResult<QueueRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            let page = self
                .store
                .read(|tx| tx.pending_page(self.kind, self.after.as_deref(), SCAN_PAGE_SIZE));

            match page {
                Ok(page) => {
                    self.done = page.len() < SCAN_PAGE_SIZE;
                    if let Some(last) = page.last() {
                        self.after = Some(last.id().to_string());
                    }
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.buffer.pop_front().map(Ok)
    }
}
