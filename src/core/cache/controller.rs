//! Read-through cache controller
//!
//! Consumers ask for an entity and get back its rows plus a [`Freshness`]
//! tag; whether the rows came from a snapshot or a live evaluation is decided
//! here and nowhere else.

use super::snapshot::{Freshness, MaterializationRecord, Snapshot, SnapshotMeta};
use super::store::SnapshotStore;
use crate::core::catalog::{Diagnostics, Evaluator, Inputs};
use crate::domain::{EntityName, Layer, Result, SemanticError, Table};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Whether a read may be served from snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Serve the entity's snapshot when one exists; dependencies of a live
    /// evaluation are read through their snapshots as well
    #[default]
    Cached,
    /// Evaluate the whole upstream chain live
    Bypass,
}

/// Rows returned by [`CacheController::get`]
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Entity actually served (`cache.x` resolves to its defining entity)
    pub entity: EntityName,
    pub table: Arc<Table>,
    pub freshness: Freshness,
    /// Data-quality diagnostics of a live evaluation; empty for snapshots
    pub diagnostics: Diagnostics,
}

/// Materialization state of one catalog entity
#[derive(Debug, Clone)]
pub struct EntityStatus {
    pub entity: EntityName,
    pub layer: Option<Layer>,
    pub snapshot: Option<SnapshotMeta>,
    pub freshness: Option<Freshness>,
    pub last_refresh: Option<MaterializationRecord>,
}

pub struct CacheController {
    evaluator: Evaluator,
    store: Arc<dyn SnapshotStore>,
    enabled: bool,
    max_age: Option<chrono::Duration>,
}

impl CacheController {
    pub fn new(evaluator: Evaluator, store: Arc<dyn SnapshotStore>) -> Self {
        let cache = &evaluator.config().cache;
        let enabled = cache.enabled;
        let max_age = cache
            .max_age_minutes
            .and_then(|m| i64::try_from(m).ok())
            .map(chrono::Duration::minutes);
        Self {
            evaluator,
            store,
            enabled,
            max_age,
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Reads an entity
    ///
    /// `cache.<relation>` names are served only from snapshots. Any other
    /// entity is served from its snapshot under [`ReadMode::Cached`] (when the
    /// cache is enabled and a snapshot exists) and evaluated live otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError::Cache`] when a `cache.` alias has no snapshot,
    /// and propagates evaluation errors of a live read.
    pub async fn get(&self, entity: &EntityName, mode: ReadMode) -> Result<ReadResult> {
        let resolved = self.evaluator.catalog().resolve(entity)?;

        if entity.is_cache_alias() {
            let snapshot = self.store.load(&resolved).await?.ok_or_else(|| {
                SemanticError::Cache(format!(
                    "{} has not been materialized; run `refresh {}` first",
                    resolved, resolved
                ))
            })?;
            return self.serve_snapshot(snapshot).await;
        }

        if self.use_snapshots(mode) {
            if let Some(snapshot) = self.store.load(&resolved).await? {
                return self.serve_snapshot(snapshot).await;
            }
            tracing::debug!(entity = %resolved, "No snapshot, evaluating live");
        }

        let evaluated_at = Utc::now();
        let (table, diagnostics) = self.evaluate_live(&resolved, mode).await?;
        Ok(ReadResult {
            entity: resolved,
            table,
            freshness: Freshness::Live { evaluated_at },
            diagnostics,
        })
    }

    /// Recomputes an entity and atomically replaces its snapshot
    ///
    /// Upstream entities are read through their snapshots while those are
    /// fresh; a stale upstream is evaluated live. On failure the previous
    /// snapshot is left untouched and a failed record is written.
    pub async fn refresh(&self, entity: &EntityName) -> Result<SnapshotMeta> {
        let resolved = self.evaluator.catalog().resolve(entity)?;
        tracing::info!(entity = %resolved, "Refreshing snapshot");

        match self.evaluate_live(&resolved, ReadMode::Cached).await {
            Ok((table, _)) => {
                let table = Arc::try_unwrap(table).unwrap_or_else(|shared| (*shared).clone());
                self.materialize(&resolved, table).await
            }
            Err(e) => {
                self.record_failure(&resolved, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Captures `table` as the new snapshot of `entity`
    pub async fn materialize(&self, entity: &EntityName, table: Table) -> Result<SnapshotMeta> {
        let snapshot = Snapshot::capture(
            entity.clone(),
            table,
            self.evaluator.as_of(),
            Utc::now(),
        )?;
        let meta = snapshot.meta();
        let record = MaterializationRecord::completed(&snapshot);

        if let Err(e) = self.store.replace(snapshot).await {
            self.record_failure(entity, &e.to_string()).await;
            return Err(e);
        }
        self.store.record(record).await?;

        tracing::info!(
            entity = %entity,
            rows = meta.row_count,
            checksum = %meta.checksum,
            "Snapshot replaced"
        );
        Ok(meta)
    }

    /// Writes a failed refresh record, keeping the previous row count
    pub async fn record_failure(&self, entity: &EntityName, message: &str) {
        let previous_rows = match self.store.load_meta(entity).await {
            Ok(meta) => meta.map_or(0, |m| m.row_count),
            Err(_) => 0,
        };
        let record = MaterializationRecord::failed(entity.clone(), Utc::now(), previous_rows, message);
        tracing::error!(entity = %entity, error = %message, "Refresh failed, previous snapshot kept");
        if let Err(e) = self.store.record(record).await {
            crate::log_error_with_context!(e, "writing materialization record");
        }
    }

    /// Snapshot and refresh state of every catalog entity, in dependency order
    pub async fn status(&self) -> Result<Vec<EntityStatus>> {
        let snapshots = self.snapshot_index().await?;
        let records: BTreeMap<EntityName, MaterializationRecord> = self
            .store
            .records()
            .await?
            .into_iter()
            .map(|r| (r.entity.clone(), r))
            .collect();

        let now = Utc::now();
        Ok(self
            .evaluator
            .catalog()
            .entities()
            .into_iter()
            .map(|definition| {
                let entity = definition.name.clone();
                let snapshot = snapshots.get(&entity).cloned();
                let freshness = snapshot
                    .as_ref()
                    .map(|meta| self.freshness_of(meta, &snapshots, now));
                EntityStatus {
                    layer: entity.layer(),
                    last_refresh: records.get(&entity).cloned(),
                    entity,
                    snapshot,
                    freshness,
                }
            })
            .collect())
    }

    fn use_snapshots(&self, mode: ReadMode) -> bool {
        self.enabled && mode == ReadMode::Cached
    }

    async fn snapshot_index(&self) -> Result<BTreeMap<EntityName, SnapshotMeta>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .map(|m| (m.entity.clone(), m))
            .collect())
    }

    async fn serve_snapshot(&self, snapshot: Snapshot) -> Result<ReadResult> {
        let snapshots = self.snapshot_index().await?;
        let freshness = self.freshness_of(&snapshot.meta(), &snapshots, Utc::now());
        if freshness.is_stale() {
            tracing::warn!(entity = %snapshot.entity, %freshness, "Serving stale snapshot");
        }
        Ok(ReadResult {
            entity: snapshot.entity,
            table: Arc::new(snapshot.table),
            freshness,
            diagnostics: Diagnostics::default(),
        })
    }

    fn freshness_of(
        &self,
        meta: &SnapshotMeta,
        snapshots: &BTreeMap<EntityName, SnapshotMeta>,
        now: DateTime<Utc>,
    ) -> Freshness {
        let age = now - meta.refreshed_at;
        let upstream_newer = self
            .evaluator
            .catalog()
            .graph()
            .upstream_closure(&meta.entity)
            .iter()
            .filter_map(|up| snapshots.get(up))
            .any(|up| up.refreshed_at > meta.refreshed_at);
        let expired = self.max_age.is_some_and(|max| age > max);
        Freshness::Snapshot {
            refreshed_at: meta.refreshed_at,
            age,
            upstream_newer,
            expired,
        }
    }

    /// Evaluates `entity` against its upstream chain
    ///
    /// Under [`ReadMode::Cached`] the walk stops at any dependency with a
    /// snapshot that is neither expired nor older than its own upstreams.
    /// The target itself is always evaluated.
    async fn evaluate_live(
        &self,
        entity: &EntityName,
        mode: ReadMode,
    ) -> Result<(Arc<Table>, Diagnostics)> {
        let catalog = self.evaluator.catalog();
        let graph = catalog.graph();
        let snapshots = if self.use_snapshots(mode) {
            self.snapshot_index().await?
        } else {
            BTreeMap::new()
        };
        let now = Utc::now();

        let mut tables: BTreeMap<EntityName, Arc<Table>> = BTreeMap::new();
        let mut needed: BTreeSet<EntityName> = BTreeSet::new();
        let mut stack = vec![entity.clone()];
        while let Some(current) = stack.pop() {
            if needed.contains(&current) || tables.contains_key(&current) {
                continue;
            }
            if &current != entity {
                if let Some(meta) = snapshots.get(&current) {
                    let freshness = self.freshness_of(meta, &snapshots, now);
                    if freshness.is_stale() {
                        tracing::debug!(entity = %current, %freshness, "Upstream snapshot is stale, evaluating live");
                    } else if let Some(snapshot) = self.store.load(&current).await? {
                        tables.insert(current, Arc::new(snapshot.table));
                        continue;
                    }
                }
            }
            stack.extend(graph.dependencies(&current));
            needed.insert(current);
        }

        let mut diagnostics = Diagnostics::default();
        for name in graph.topological_order() {
            if !needed.contains(&name) {
                continue;
            }
            let mut inputs = Inputs::new();
            for dep in graph.dependencies(&name) {
                let table = tables.get(&dep).ok_or_else(|| {
                    SemanticError::evaluation(name.to_string(), format!("input {} is unavailable", dep))
                })?;
                inputs.insert(dep, Arc::clone(table));
            }
            let evaluated = self.evaluator.evaluate(&name, inputs).await?;
            diagnostics.merge(&evaluated.diagnostics);
            tables.insert(name, Arc::new(evaluated.table));
        }

        let table = tables.remove(entity).ok_or_else(|| {
            SemanticError::evaluation(entity.to_string(), "entity was not evaluated")
        })?;
        Ok((table, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::{MemorySource, SourceReader};
    use crate::config::SemanticConfig;
    use crate::core::cache::MemorySnapshotStore;
    use crate::core::catalog::{Catalog, EntityDefinition};
    use crate::core::staging::{ColumnSpec, StagingModel};
    use crate::domain::{Column, DataType, Namespace, Value};
    use chrono::NaiveDate;

    fn raw(ids: &[i64]) -> Table {
        Table::from_rows(
            vec![Column::new("EmpID", DataType::Int)],
            ids.iter().map(|&i| vec![Value::Int(i)]).collect(),
        )
        .unwrap()
    }

    fn controller(source: Arc<MemorySource>) -> CacheController {
        controller_with(source, SemanticConfig::default())
    }

    fn controller_with(source: Arc<MemorySource>, config: SemanticConfig) -> CacheController {
        let staging = StagingModel::new(
            EntityName::new(Namespace::Staging, "stg_people").unwrap(),
            vec!["People".to_string()],
            vec![ColumnSpec::key("EmpID", DataType::Int)],
        );
        let count = EntityDefinition::derived(
            "business.people_count".parse().unwrap(),
            "row count",
            vec!["staging.stg_people".parse().unwrap()],
            |inputs, _ctx| {
                inputs
                    .get("stg_people")?
                    .group_by(&[], &[crate::core::relation::Aggregate::count("people")])
            },
        );
        let catalog = Catalog::new(vec![EntityDefinition::staging(staging, "people"), count]).unwrap();
        let reader: Arc<dyn SourceReader + Send + Sync> = source;
        let evaluator = Evaluator::new(
            Arc::new(catalog),
            reader,
            Arc::new(config),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );
        CacheController::new(evaluator, Arc::new(MemorySnapshotStore::new()))
    }

    fn source(ids: &[i64]) -> Arc<MemorySource> {
        let extracted = NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Arc::new(MemorySource::new(extracted).with_table("People", raw(ids)))
    }

    fn count(result: &ReadResult) -> &Value {
        &result.table.raw_rows()[0][0]
    }

    #[tokio::test]
    async fn test_read_before_refresh_is_live() {
        let ctl = controller(source(&[1, 2]));
        let name: EntityName = "business.people_count".parse().unwrap();

        let result = ctl.get(&name, ReadMode::Cached).await.unwrap();
        assert!(result.freshness.is_live());
        assert_eq!(count(&result), &Value::Int(2));
    }

    #[tokio::test]
    async fn test_refresh_then_read_matches_live() {
        let ctl = controller(source(&[1, 2, 3]));
        let name: EntityName = "business.people_count".parse().unwrap();

        ctl.refresh(&name).await.unwrap();
        let cached = ctl.get(&name, ReadMode::Cached).await.unwrap();
        let live = ctl.get(&name, ReadMode::Bypass).await.unwrap();

        assert!(!cached.freshness.is_live());
        assert!(live.freshness.is_live());
        assert_eq!(cached.table, live.table);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let src = source(&[1, 2]);
        let ctl = controller(Arc::clone(&src));
        let name: EntityName = "business.people_count".parse().unwrap();
        ctl.refresh(&name).await.unwrap();

        src.insert("People", raw(&[1, 2, 3, 4]));
        src.fail_table("People");
        assert!(ctl.refresh(&name).await.is_err());

        let result = ctl.get(&name, ReadMode::Cached).await.unwrap();
        assert_eq!(count(&result), &Value::Int(2));

        let records = ctl.store().records().await.unwrap();
        let record = records.iter().find(|r| r.entity == name).unwrap();
        assert!(!record.status.is_completed());
        assert_eq!(record.row_count, 1);
    }

    #[tokio::test]
    async fn test_cache_alias_requires_snapshot() {
        let ctl = controller(source(&[1]));
        let alias: EntityName = "cache.people_count".parse().unwrap();
        assert!(matches!(
            ctl.get(&alias, ReadMode::Cached).await,
            Err(SemanticError::Cache(_))
        ));

        ctl.refresh(&alias).await.unwrap();
        let result = ctl.get(&alias, ReadMode::Cached).await.unwrap();
        assert_eq!(result.entity.qualified(), "business.people_count");
    }

    #[tokio::test]
    async fn test_upstream_refresh_marks_dependent_stale() {
        let ctl = controller(source(&[1]));
        let count_name: EntityName = "business.people_count".parse().unwrap();
        let staging_name: EntityName = "staging.stg_people".parse().unwrap();

        ctl.refresh(&count_name).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        ctl.refresh(&staging_name).await.unwrap();

        let status = ctl.status().await.unwrap();
        let count_status = status.iter().find(|s| s.entity == count_name).unwrap();
        assert!(count_status.freshness.as_ref().unwrap().is_stale());
    }

    #[tokio::test]
    async fn test_refresh_skips_expired_upstream_snapshot() {
        let mut config = SemanticConfig::default();
        config.cache.max_age_minutes = Some(1);
        let ctl = controller_with(source(&[1, 2]), config);
        let count_name: EntityName = "business.people_count".parse().unwrap();
        let staging_name: EntityName = "staging.stg_people".parse().unwrap();

        // Empty staging snapshot taken two hours ago
        let old = Snapshot::capture(
            staging_name.clone(),
            Table::new(vec![Column::new("emp_id", DataType::Int)]),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            Utc::now() - chrono::Duration::hours(2),
        )
        .unwrap();
        ctl.store().replace(old).await.unwrap();

        ctl.refresh(&count_name).await.unwrap();
        let cached = ctl.get(&count_name, ReadMode::Cached).await.unwrap();
        let live = ctl.get(&count_name, ReadMode::Bypass).await.unwrap();
        assert_eq!(cached.table, live.table);
        assert_eq!(count(&cached), &Value::Int(2));
    }

    #[tokio::test]
    async fn test_refresh_uses_fresh_upstream_snapshot() {
        let src = source(&[1, 2]);
        let ctl = controller(Arc::clone(&src));
        let count_name: EntityName = "business.people_count".parse().unwrap();
        let staging_name: EntityName = "staging.stg_people".parse().unwrap();

        ctl.refresh(&staging_name).await.unwrap();
        src.insert("People", raw(&[1, 2, 3]));
        ctl.refresh(&count_name).await.unwrap();

        let cached = ctl.get(&count_name, ReadMode::Cached).await.unwrap();
        assert_eq!(count(&cached), &Value::Int(2));
    }
}
