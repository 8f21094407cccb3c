//! Materialization and read-through caching
//!
//! - [`snapshot`] - snapshot, refresh log and freshness types
//! - [`store`] - the [`SnapshotStore`] trait and its in-memory implementation
//! - [`controller`] - [`CacheController`], the single read path for consumers

pub mod controller;
pub mod snapshot;
pub mod store;

pub use controller::{CacheController, EntityStatus, ReadMode, ReadResult};
pub use snapshot::{Freshness, MaterializationRecord, RefreshStatus, Snapshot, SnapshotMeta};
pub use store::{MemorySnapshotStore, SnapshotStore};

use crate::adapters::filesystem::FileSnapshotStore;
use crate::adapters::source::create_staging_source;
use crate::config::SemanticConfig;
use crate::core::catalog::{standard_catalog, Evaluator};
use crate::domain::Result;
use std::sync::Arc;

/// Opens the file-backed snapshot store under the configured cache directory
pub async fn open_snapshot_store(config: &SemanticConfig) -> Result<Arc<dyn SnapshotStore>> {
    let dir = config.cache_dir();
    let store = FileSnapshotStore::open(&dir).await?;
    tracing::debug!(path = %dir.display(), "Opened snapshot store");
    Ok(Arc::new(store))
}

/// Wires the standard catalog, the staging source for the configured mode
/// and the file snapshot store into one controller
///
/// The run date is fixed here for every read served by the controller.
pub async fn open_controller(config: Arc<SemanticConfig>) -> Result<CacheController> {
    let catalog = Arc::new(standard_catalog(&config)?);
    let reader = create_staging_source(&config).await?;
    let store = open_snapshot_store(&config).await?;
    let as_of = config.pipeline.run_date();
    tracing::debug!(%as_of, mode = ?config.source.mode, "Opening cache controller");
    let evaluator = Evaluator::new(catalog, reader, config, as_of);
    Ok(CacheController::new(evaluator, store))
}
