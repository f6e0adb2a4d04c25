pub mod app;
pub mod connectivity;
pub mod engine;
pub mod hybrid;
pub mod log;
pub mod palms;
pub mod retry;
pub mod status;

pub use app::{FieldSync, Settings};
pub use connectivity::{Connectivity, HttpProbe, LinkState};
pub use engine::{SyncEngine, SyncReport, SyncResult, SyncSettings};
pub use hybrid::{HybridWriter, WriteOutcome};
pub use palms::PalmCache;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use status::{SyncCoordinator, SyncEvent, SyncPhase, SyncStatus, Transition, TriggerTiming};
