use super::activity::ActivityRecord;
use super::attendance::AttendanceRecord;
use super::record_kind::RecordKind;
use super::sync_state::SyncState;

/// The unit of durable work held in the local queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueRecord {
    Activity(ActivityRecord),
    Attendance(AttendanceRecord),
}

impl QueueRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            QueueRecord::Activity(_) => RecordKind::Activity,
            QueueRecord::Attendance(_) => RecordKind::Attendance,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            QueueRecord::Activity(a) => &a.id,
            QueueRecord::Attendance(a) => &a.id,
        }
    }

    /// Palm identifier or employee identifier.
    pub fn subject_key(&self) -> &str {
        match self {
            QueueRecord::Activity(a) => &a.palm_id,
            QueueRecord::Attendance(a) => &a.employee_id,
        }
    }

    pub fn sync_state(&self) -> SyncState {
        match self {
            QueueRecord::Activity(a) => a.sync_state,
            QueueRecord::Attendance(a) => a.sync_state,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.sync_state().is_synced()
    }

    pub fn created_at(&self) -> i64 {
        match self {
            QueueRecord::Activity(a) => a.created_at,
            QueueRecord::Attendance(a) => a.created_at,
        }
    }

    pub fn set_sync_state(&mut self, state: SyncState) {
        match self {
            QueueRecord::Activity(a) => a.sync_state = state,
            QueueRecord::Attendance(a) => a.sync_state = state,
        }
    }

    pub fn as_activity(&self) -> Option<&ActivityRecord> {
        match self {
            QueueRecord::Activity(a) => Some(a),
            QueueRecord::Attendance(_) => None,
        }
    }

    pub fn as_attendance(&self) -> Option<&AttendanceRecord> {
        match self {
            QueueRecord::Attendance(a) => Some(a),
            QueueRecord::Activity(_) => None,
        }
    }
}

impl From<ActivityRecord> for QueueRecord {
    fn from(r: ActivityRecord) -> Self {
        QueueRecord::Activity(r)
    }
}

impl From<AttendanceRecord> for QueueRecord {
    fn from(r: AttendanceRecord) -> Self {
        QueueRecord::Attendance(r)
    }
}
