//! SQL for the queue tables, the metadata row and the palm cache.
//! Every function takes a plain `&Connection` so it can run inside any
//! transaction opened by `LocalStore`.

use crate::errors::{AppError, AppResult};
use crate::models::{
    ActivityRecord, ActivityType, AttendanceRecord, CachedPalm, Palm, QueueRecord, RecordKind,
    SyncMetadata, SyncState, VerifiedBy,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn conversion_error(col: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(err))
}

fn map_sync_state(row: &Row, col: usize) -> rusqlite::Result<SyncState> {
    let raw: String = row.get(col)?;
    SyncState::from_db_str(&raw).ok_or_else(|| {
        conversion_error(col, AppError::Other(format!("Invalid sync_state: {}", raw)))
    })
}

const ACTIVITY_COLUMNS: &str = "id, palm_id, activity_type, payload, sync_state, created_at";
const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, check_in_at, check_out_at, verified_by, sync_state, created_at";

pub fn map_activity(row: &Row) -> rusqlite::Result<ActivityRecord> {
    let kind_str: String = row.get(2)?;
    let activity_type = ActivityType::parse(&kind_str).map_err(|e| conversion_error(2, e))?;

    let payload_str: String = row.get(3)?;
    let payload = serde_json::from_str(&payload_str)
        .map_err(|e| conversion_error(3, AppError::Json(e)))?;

    Ok(ActivityRecord {
        id: row.get(0)?,
        palm_id: row.get(1)?,
        activity_type,
        payload,
        sync_state: map_sync_state(row, 4)?,
        created_at: row.get(5)?,
    })
}

pub fn map_attendance(row: &Row) -> rusqlite::Result<AttendanceRecord> {
    let verified_str: String = row.get(4)?;
    let verified_by = VerifiedBy::from_db_str(&verified_str).ok_or_else(|| {
        conversion_error(
            4,
            AppError::Other(format!("Invalid verified_by: {}", verified_str)),
        )
    })?;

    Ok(AttendanceRecord {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        check_in_at: row.get(2)?,
        check_out_at: row.get(3)?,
        verified_by,
        sync_state: map_sync_state(row, 5)?,
        created_at: row.get(6)?,
    })
}

fn map_record(kind: RecordKind, row: &Row) -> rusqlite::Result<QueueRecord> {
    match kind {
        RecordKind::Activity => map_activity(row).map(QueueRecord::Activity),
        RecordKind::Attendance => map_attendance(row).map(QueueRecord::Attendance),
    }
}

fn columns(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Activity => ACTIVITY_COLUMNS,
        RecordKind::Attendance => ATTENDANCE_COLUMNS,
    }
}

fn subject_column(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Activity => "palm_id",
        RecordKind::Attendance => "employee_id",
    }
}

/// Upsert by id (overwrite semantics).
pub fn upsert_record(conn: &Connection, record: &QueueRecord) -> AppResult<()> {
    match record {
        QueueRecord::Activity(a) => {
            conn.execute(
                "INSERT OR REPLACE INTO activities_queue
                    (id, palm_id, activity_type, payload, sync_state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    a.id,
                    a.palm_id,
                    a.activity_type.as_str(),
                    serde_json::to_string(&a.payload)?,
                    a.sync_state.to_db_str(),
                    a.created_at,
                ],
            )?;
        }
        QueueRecord::Attendance(a) => {
            conn.execute(
                "INSERT OR REPLACE INTO attendance_queue
                    (id, employee_id, check_in_at, check_out_at, verified_by, sync_state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    a.id,
                    a.employee_id,
                    a.check_in_at,
                    a.check_out_at,
                    a.verified_by.to_db_str(),
                    a.sync_state.to_db_str(),
                    a.created_at,
                ],
            )?;
        }
    }
    Ok(())
}

pub fn load_record(conn: &Connection, kind: RecordKind, id: &str) -> AppResult<Option<QueueRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        columns(kind),
        kind.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row([id], |row| map_record(kind, row)).optional()?)
}

pub fn load_by_subject(
    conn: &Connection,
    kind: RecordKind,
    subject: &str,
) -> AppResult<Vec<QueueRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1 ORDER BY created_at ASC",
        columns(kind),
        kind.table(),
        subject_column(kind)
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([subject], |row| map_record(kind, row))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// One page of the `(sync_state, id)` index range `state = ?, id > after`.
pub fn load_page_by_state(
    conn: &Connection,
    kind: RecordKind,
    state: SyncState,
    after: Option<&str>,
    limit: usize,
) -> AppResult<Vec<QueueRecord>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE sync_state = ?1 AND id > ?2 ORDER BY id ASC LIMIT ?3",
        columns(kind),
        kind.table()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![state.to_db_str(), after.unwrap_or(""), limit as i64],
        |row| map_record(kind, row),
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn load_all(conn: &Connection, kind: RecordKind) -> AppResult<Vec<QueueRecord>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY created_at ASC",
        columns(kind),
        kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| map_record(kind, row))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_by_state(conn: &Connection, kind: RecordKind, state: SyncState) -> AppResult<u64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE sync_state = ?1", kind.table());
    let n: i64 = conn.query_row(&sql, [state.to_db_str()], |row| row.get(0))?;
    Ok(n as u64)
}

/// Only flips rows that are still pending; returns how many changed.
pub fn mark_synced(conn: &Connection, kind: RecordKind, id: &str) -> AppResult<usize> {
    let sql = format!(
        "UPDATE {} SET sync_state = 'synced' WHERE id = ?1 AND sync_state = 'pending'",
        kind.table()
    );
    Ok(conn.execute(&sql, [id])?)
}

pub fn delete_record(conn: &Connection, kind: RecordKind, id: &str) -> AppResult<usize> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
    Ok(conn.execute(&sql, [id])?)
}

pub fn clear_kind(conn: &Connection, kind: RecordKind) -> AppResult<usize> {
    let sql = format!("DELETE FROM {}", kind.table());
    Ok(conn.execute(&sql, [])?)
}

/// Open (no check-out) attendance of `employee_id` with check-in in `[start, end)`.
pub fn find_open_attendance(
    conn: &Connection,
    employee_id: &str,
    start: i64,
    end: i64,
) -> AppResult<Option<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance_queue
         WHERE employee_id = ?1 AND check_in_at >= ?2 AND check_in_at < ?3
           AND check_out_at IS NULL
         ORDER BY check_in_at ASC
         LIMIT 1",
        ATTENDANCE_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt
        .query_row(params![employee_id, start, end], map_attendance)
        .optional()?)
}

/// Any attendance (open or closed) of `employee_id` with check-in in `[start, end)`.
pub fn find_attendance_in(
    conn: &Connection,
    employee_id: &str,
    start: i64,
    end: i64,
) -> AppResult<Option<AttendanceRecord>> {
    let sql = format!(
        "SELECT {} FROM attendance_queue
         WHERE employee_id = ?1 AND check_in_at >= ?2 AND check_in_at < ?3
         ORDER BY (check_out_at IS NULL) DESC, check_in_at DESC
         LIMIT 1",
        ATTENDANCE_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt
        .query_row(params![employee_id, start, end], map_attendance)
        .optional()?)
}

// ---------------------------------------------------------------------------
// sync_metadata
// ---------------------------------------------------------------------------

pub fn load_metadata(conn: &Connection) -> AppResult<Option<SyncMetadata>> {
    let mut stmt = conn.prepare_cached(
        "SELECT last_sync_time, pending_count, failed_count FROM sync_metadata WHERE key = ?1",
    )?;
    Ok(stmt
        .query_row([SyncMetadata::KEY], |row| {
            Ok(SyncMetadata {
                last_sync_time: row.get(0)?,
                pending_count: row.get::<_, i64>(1)? as u64,
                failed_count: row.get::<_, i64>(2)? as u64,
            })
        })
        .optional()?)
}

pub fn save_metadata(conn: &Connection, meta: &SyncMetadata) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sync_metadata (key, last_sync_time, pending_count, failed_count)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            SyncMetadata::KEY,
            meta.last_sync_time,
            meta.pending_count as i64,
            meta.failed_count as i64,
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// palms_cache
// ---------------------------------------------------------------------------

pub fn upsert_palm(conn: &Connection, palm: &Palm, cached_at: i64) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO palms_cache
            (qr_code, id, block_id, block_name, block_code, row_number, column_number,
             planting_date, variety, status, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    stmt.execute(params![
        palm.qr_code,
        palm.id,
        palm.block_id,
        palm.block_name,
        palm.block_code,
        palm.row_number,
        palm.column_number,
        palm.planting_date,
        palm.variety,
        palm.status,
        cached_at,
    ])?;
    Ok(())
}

pub fn load_palm(conn: &Connection, qr_code: &str) -> AppResult<Option<CachedPalm>> {
    let mut stmt = conn.prepare_cached(
        "SELECT qr_code, id, block_id, block_name, block_code, row_number, column_number,
                planting_date, variety, status, cached_at
         FROM palms_cache WHERE qr_code = ?1",
    )?;
    Ok(stmt
        .query_row([qr_code.trim()], |row| {
            Ok(CachedPalm {
                palm: Palm {
                    qr_code: row.get(0)?,
                    id: row.get(1)?,
                    block_id: row.get(2)?,
                    block_name: row.get(3)?,
                    block_code: row.get(4)?,
                    row_number: row.get(5)?,
                    column_number: row.get(6)?,
                    planting_date: row.get(7)?,
                    variety: row.get(8)?,
                    status: row.get(9)?,
                },
                cached_at: row.get(10)?,
            })
        })
        .optional()?)
}

pub fn count_palms(conn: &Connection) -> AppResult<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM palms_cache", [], |row| row.get(0))?;
    Ok(n as u64)
}

pub fn clear_palms(conn: &Connection) -> AppResult<usize> {
    Ok(conn.execute("DELETE FROM palms_cache", [])?)
}
