use serde::Serialize;

/// Process-wide sync bookkeeping, stored as the single `last_sync` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncMetadata {
    pub last_sync_time: Option<i64>,
    pub pending_count: u64,
    pub failed_count: u64,
}

impl SyncMetadata {
    pub const KEY: &'static str = "last_sync";
}
