use serde::{Deserialize, Serialize};

/// Secondary-index key of every queue record.
///
/// Stored as TEXT (`'pending'` / `'synced'`) so that the `(sync_state, id)`
/// index can be range-scanned directly instead of filtering a boolean column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Pending,
    Synced,
}

impl SyncState {
    pub fn from_synced(synced: bool) -> Self {
        if synced {
            SyncState::Synced
        } else {
            SyncState::Pending
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }

    /// Convert enum → DB string
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
        }
    }

    /// Convert DB string → enum
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncState::Pending),
            "synced" => Some(SyncState::Synced),
            _ => None,
        }
    }
}
