//! Snapshot storage abstraction
//!
//! The cache controller owns a `SnapshotStore` trait object. The file-backed
//! implementation lives in `adapters::filesystem`; [`MemorySnapshotStore`] is
//! used by tests and by runs with the cache disabled.

use super::snapshot::{MaterializationRecord, Snapshot, SnapshotMeta};
use crate::domain::{EntityName, Result, SemanticError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Persistence for materialized snapshots and their refresh log
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the current snapshot of an entity
    ///
    /// Returns `Ok(None)` when the entity has never been materialized.
    async fn load(&self, entity: &EntityName) -> Result<Option<Snapshot>>;

    /// Loads only the snapshot header
    async fn load_meta(&self, entity: &EntityName) -> Result<Option<SnapshotMeta>> {
        Ok(self.load(entity).await?.map(|s| s.meta()))
    }

    /// Replaces the snapshot of `snapshot.entity`
    ///
    /// Readers observe either the previous snapshot or the new one, never a
    /// partial write.
    async fn replace(&self, snapshot: Snapshot) -> Result<()>;

    /// Headers of every stored snapshot, ordered by entity name
    async fn list(&self) -> Result<Vec<SnapshotMeta>>;

    /// Upserts the refresh log entry for an entity
    async fn record(&self, record: MaterializationRecord) -> Result<()>;

    /// All refresh log entries, ordered by entity name
    async fn records(&self) -> Result<Vec<MaterializationRecord>>;

    fn describe(&self) -> String;
}

/// Snapshot store held in process memory
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<EntityName, Snapshot>>,
    records: RwLock<BTreeMap<EntityName, MaterializationRecord>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, entity: &EntityName) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(entity).cloned())
    }

    async fn load_meta(&self, entity: &EntityName) -> Result<Option<SnapshotMeta>> {
        Ok(self.snapshots.read().await.get(entity).map(Snapshot::meta))
    }

    async fn replace(&self, snapshot: Snapshot) -> Result<()> {
        if snapshot.entity.is_cache_alias() {
            return Err(SemanticError::Cache(format!(
                "cannot store a snapshot under alias {}",
                snapshot.entity
            )));
        }
        self.snapshots
            .write()
            .await
            .insert(snapshot.entity.clone(), snapshot);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SnapshotMeta>> {
        Ok(self
            .snapshots
            .read()
            .await
            .values()
            .map(Snapshot::meta)
            .collect())
    }

    async fn record(&self, record: MaterializationRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.entity.clone(), record);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<MaterializationRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
