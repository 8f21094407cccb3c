//! File-backed snapshot store
//!
//! Layout under the cache directory:
//!
//! ```text
//! <cache_dir>/
//!   business.employee_summary.json     one Snapshot document per entity
//!   metrics.headcount_metrics.json
//!   _snapshots.json                    header of every stored snapshot
//!   _materializations.json             refresh log, one record per entity
//! ```
//!
//! Headers are read from `_snapshots.json`, so listing the store or checking
//! freshness never parses the snapshot documents themselves.

use super::{read_json, write_json_atomic};
use crate::core::cache::snapshot::{MaterializationRecord, Snapshot, SnapshotMeta};
use crate::core::cache::store::SnapshotStore;
use crate::domain::{EntityName, Result, SemanticError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const RECORDS_FILE: &str = "_materializations.json";
const INDEX_FILE: &str = "_snapshots.json";

pub struct FileSnapshotStore {
    dir: PathBuf,
    /// Serialises snapshot replacement and log updates
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Opens (creating if needed) a store rooted at `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            SemanticError::Cache(format!("cannot create cache directory {}: {}", dir.display(), e))
        })?;
        tracing::debug!(path = %dir.display(), "Opened snapshot store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn snapshot_path(&self, entity: &EntityName) -> PathBuf {
        self.dir.join(format!("{}.json", entity.qualified()))
    }

    async fn read_index(&self) -> Result<BTreeMap<EntityName, SnapshotMeta>> {
        let metas: Vec<SnapshotMeta> = read_json(&self.dir.join(INDEX_FILE))
            .await?
            .unwrap_or_default();
        Ok(metas.into_iter().map(|m| (m.entity.clone(), m)).collect())
    }

    async fn read_records(&self) -> Result<BTreeMap<EntityName, MaterializationRecord>> {
        let records: Vec<MaterializationRecord> = read_json(&self.dir.join(RECORDS_FILE))
            .await?
            .unwrap_or_default();
        Ok(records.into_iter().map(|r| (r.entity.clone(), r)).collect())
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, entity: &EntityName) -> Result<Option<Snapshot>> {
        let snapshot: Option<Snapshot> = read_json(&self.snapshot_path(entity))
            .await
            .map_err(|e| SemanticError::Cache(format!("failed to read snapshot {}: {}", entity, e)))?;

        match snapshot {
            Some(snapshot) if !snapshot.verify()? => Err(SemanticError::Cache(format!(
                "snapshot {} failed checksum verification",
                entity
            ))),
            other => Ok(other),
        }
    }

    async fn replace(&self, snapshot: Snapshot) -> Result<()> {
        if snapshot.entity.is_cache_alias() {
            return Err(SemanticError::Cache(format!(
                "cannot store a snapshot under alias {}",
                snapshot.entity
            )));
        }
        let _guard = self.write_lock.lock().await;
        let path = self.snapshot_path(&snapshot.entity);
        write_json_atomic(&path, &snapshot).await?;

        let mut index = self.read_index().await?;
        index.insert(snapshot.entity.clone(), snapshot.meta());
        let index: Vec<_> = index.into_values().collect();
        write_json_atomic(&self.dir.join(INDEX_FILE), &index).await?;
        tracing::debug!(
            entity = %snapshot.entity,
            rows = snapshot.row_count,
            path = %path.display(),
            "Snapshot replaced"
        );
        Ok(())
    }

    async fn load_meta(&self, entity: &EntityName) -> Result<Option<SnapshotMeta>> {
        Ok(self.read_index().await?.remove(entity))
    }

    async fn list(&self) -> Result<Vec<SnapshotMeta>> {
        Ok(self.read_index().await?.into_values().collect())
    }

    async fn record(&self, record: MaterializationRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        records.insert(record.entity.clone(), record);
        let records: Vec<_> = records.into_values().collect();
        write_json_atomic(&self.dir.join(RECORDS_FILE), &records).await
    }

    async fn records(&self) -> Result<Vec<MaterializationRecord>> {
        Ok(self.read_records().await?.into_values().collect())
    }

    fn describe(&self) -> String {
        format!("file store {}", self.dir.display())
    }
}
