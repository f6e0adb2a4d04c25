//! Provisional record ids.

use uuid::Uuid;

/// Random, collision-resistant local id for a record not yet known remotely.
pub fn provisional_id() -> String {
    Uuid::new_v4().to_string()
}
