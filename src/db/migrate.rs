use crate::ui::messages::success;
use rusqlite::{Connection, OptionalExtension, Result};
use tracing::debug;

/// Ensure that the `log` table exists; it also tracks applied migrations.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Ordered schema steps. Each runs once and is then recorded in `log`.
const MIGRATIONS: &[(&str, &str, &str)] = &[
    (
        "20261001_0001_activities_queue",
        "Created activities_queue with sync_state index",
        r#"
        CREATE TABLE IF NOT EXISTS activities_queue (
            id            TEXT PRIMARY KEY,
            palm_id       TEXT NOT NULL,
            activity_type TEXT NOT NULL,
            payload       TEXT NOT NULL DEFAULT '{}',
            sync_state    TEXT NOT NULL DEFAULT 'pending' CHECK(sync_state IN ('pending','synced')),
            created_at    INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_activities_sync_state ON activities_queue(sync_state, id);
        CREATE INDEX IF NOT EXISTS idx_activities_palm_id ON activities_queue(palm_id);
        CREATE INDEX IF NOT EXISTS idx_activities_created ON activities_queue(created_at);
        "#,
    ),
    (
        "20261001_0002_attendance_queue",
        "Created attendance_queue with sync_state index",
        r#"
        CREATE TABLE IF NOT EXISTS attendance_queue (
            id           TEXT PRIMARY KEY,
            employee_id  TEXT NOT NULL,
            check_in_at  INTEGER NOT NULL,
            check_out_at INTEGER,
            verified_by  TEXT NOT NULL DEFAULT 'FINGERPRINT',
            sync_state   TEXT NOT NULL DEFAULT 'pending' CHECK(sync_state IN ('pending','synced')),
            created_at   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_attendance_sync_state ON attendance_queue(sync_state, id);
        CREATE INDEX IF NOT EXISTS idx_attendance_employee ON attendance_queue(employee_id, check_in_at);
        CREATE INDEX IF NOT EXISTS idx_attendance_created ON attendance_queue(created_at);
        "#,
    ),
    (
        "20261001_0003_sync_metadata",
        "Created sync_metadata",
        r#"
        CREATE TABLE IF NOT EXISTS sync_metadata (
            key            TEXT PRIMARY KEY,
            last_sync_time INTEGER,
            pending_count  INTEGER NOT NULL DEFAULT 0,
            failed_count   INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "20261008_0004_palms_cache",
        "Created palms_cache keyed by QR code",
        r#"
        CREATE TABLE IF NOT EXISTS palms_cache (
            qr_code       TEXT PRIMARY KEY,
            id            TEXT NOT NULL,
            block_id      TEXT NOT NULL,
            block_name    TEXT NOT NULL DEFAULT '',
            block_code    TEXT NOT NULL DEFAULT '',
            row_number    INTEGER,
            column_number INTEGER,
            planting_date TEXT,
            variety       TEXT,
            status        TEXT NOT NULL,
            cached_at     INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_palms_block ON palms_cache(block_code);
        CREATE INDEX IF NOT EXISTS idx_palms_status ON palms_cache(status);
        "#,
    ),
];

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, version: &str, message: &str, sql: &str) -> Result<()> {
    conn.execute_batch(sql)?;
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Invoked by `LocalStore::open()`. Returns the number of steps applied.
pub fn run_pending_migrations(conn: &Connection, verbose: bool) -> Result<usize> {
    ensure_log_table(conn)?;

    let mut applied = 0;
    for (version, message, sql) in MIGRATIONS {
        if is_applied(conn, version)? {
            continue;
        }

        apply(conn, version, message, sql)?;
        applied += 1;
        debug!(version, "migration applied");

        if verbose {
            success(format!("Migration applied: {} → {}", version, message));
        }
    }

    Ok(applied)
}
