pub mod log;
pub mod migrate;
pub mod queries;
pub mod store;

pub use store::{LocalStore, StoreTx, TxMode, UnsyncedScan};
