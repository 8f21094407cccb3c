//! Rebuild and import orchestration
//!
//! - [`coordinator`] - level-wise rebuild of every layer with per-entity isolation
//! - [`import`] - import mode copy of source tables into the local raw store
//! - [`summary`] - run summaries and their log output

pub mod coordinator;
pub mod import;
pub mod summary;

pub use coordinator::RebuildCoordinator;
pub use import::{import_tables, ImportSummary, ImportedTable};
pub use summary::{RefreshFailure, RefreshSummary};
