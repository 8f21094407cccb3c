//! Snapshot integrity checks

pub mod checksum;

pub use checksum::{calculate_checksum, table_checksum};
