pub mod activity;
pub mod attendance;
pub mod metadata;
pub mod palm;
pub mod record;
pub mod record_kind;
pub mod sync_state;

pub use activity::{ActivityInput, ActivityRecord, ActivityType};
pub use attendance::{AttendanceRecord, CheckInInput, VerifiedBy};
pub use metadata::SyncMetadata;
pub use palm::{CachedPalm, Palm};
pub use record::QueueRecord;
pub use record_kind::RecordKind;
pub use sync_state::SyncState;
