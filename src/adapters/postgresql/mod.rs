//! PostgreSQL source integration
//!
//! Reads the HR system-of-record tables for federated staging and for bulk
//! import into the local raw store.

pub mod client;
pub mod source;

pub use client::PostgreSQLClient;
pub use source::PostgreSQLSource;
