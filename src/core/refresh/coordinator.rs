//! Rebuild coordinator
//!
//! Rebuilds every layer from the source in dependency order. Entities in one
//! level of the plan share no dependency and are evaluated concurrently; a
//! failed entity keeps its previous snapshot and its dependents are skipped.

use super::summary::RefreshSummary;
use crate::core::cache::CacheController;
use crate::core::catalog::{Catalog, Evaluated, Inputs};
use crate::domain::{EntityName, Layer, Result, SemanticError, Table};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct RebuildCoordinator {
    controller: Arc<CacheController>,
    materialize: BTreeSet<EntityName>,
    max_parallel: usize,
}

impl RebuildCoordinator {
    /// Creates a coordinator snapshotting the entities listed in
    /// `cache.materialize`, or every business, metrics and alerts entity when
    /// the list is empty
    ///
    /// # Errors
    ///
    /// Returns a catalog error if a listed entity is unknown.
    pub fn new(controller: Arc<CacheController>) -> Result<Self> {
        let config = controller.evaluator().config();
        let catalog = controller.evaluator().catalog();
        let materialize = materialize_set(catalog, &config.cache.materialize)?;
        let max_parallel = config.pipeline.max_parallel.max(1);
        Ok(Self {
            controller,
            materialize,
            max_parallel,
        })
    }

    pub fn materialized_entities(&self) -> &BTreeSet<EntityName> {
        &self.materialize
    }

    /// Evaluates every entity live and replaces the selected snapshots
    ///
    /// Entity failures are reported in the summary, not returned as errors.
    pub async fn rebuild(&self) -> Result<RefreshSummary> {
        let started = Instant::now();
        let evaluator = self.controller.evaluator().clone();
        let catalog = Arc::clone(evaluator.catalog());
        let graph = catalog.graph();
        let mut summary = RefreshSummary::new(evaluator.as_of());

        tracing::info!(
            as_of = %evaluator.as_of(),
            entities = graph.topological_order().len(),
            levels = graph.levels().len(),
            materialize = self.materialize.len(),
            "Starting rebuild"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut results: BTreeMap<EntityName, Arc<Table>> = BTreeMap::new();
        let mut unavailable: BTreeSet<EntityName> = BTreeSet::new();

        for (level_no, level) in graph.levels().iter().enumerate() {
            tracing::debug!(level = level_no, entities = level.len(), "Evaluating level");
            let mut tasks: JoinSet<(EntityName, Result<Evaluated>)> = JoinSet::new();

            for entity in level {
                let dependencies = graph.dependencies(entity);
                if dependencies.iter().any(|d| unavailable.contains(d)) {
                    unavailable.insert(entity.clone());
                    summary.skipped.push(entity.clone());
                    continue;
                }

                let mut inputs = Inputs::new();
                for dep in dependencies {
                    if let Some(table) = results.get(&dep) {
                        inputs.insert(dep, Arc::clone(table));
                    }
                }

                let evaluator = evaluator.clone();
                let semaphore = Arc::clone(&semaphore);
                let entity = entity.clone();
                tasks.spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let err = SemanticError::evaluation(entity.to_string(), e.to_string());
                            return (entity, Err(err));
                        }
                    };
                    let result = evaluator.evaluate(&entity, inputs).await;
                    (entity, result)
                });
            }

            let mut finished: Vec<(EntityName, Result<Evaluated>)> = Vec::with_capacity(level.len());
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => finished.push(outcome),
                    Err(e) => return Err(SemanticError::Other(format!("rebuild task panicked: {}", e))),
                }
            }
            // Deterministic snapshot write order within a level
            finished.sort_by(|a, b| a.0.cmp(&b.0));

            for (entity, outcome) in finished {
                match outcome {
                    Ok(evaluated) => {
                        summary.total_rows += evaluated.table.len();
                        summary.diagnostics.merge(&evaluated.diagnostics);
                        summary.built.push(entity.clone());

                        if self.materialize.contains(&entity) {
                            match self
                                .controller
                                .materialize(&entity, evaluated.table.clone())
                                .await
                            {
                                Ok(_) => summary.materialized.push(entity.clone()),
                                Err(e) => summary.add_failure(entity.clone(), e.to_string()),
                            }
                        }
                        results.insert(entity, Arc::new(evaluated.table));
                    }
                    Err(e) => {
                        if self.materialize.contains(&entity) {
                            self.controller.record_failure(&entity, &e.to_string()).await;
                        } else {
                            tracing::error!(entity = %entity, error = %e, "Entity evaluation failed");
                        }
                        summary.add_failure(entity.clone(), e.to_string());
                        unavailable.insert(entity);
                    }
                }
            }
        }

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}

/// Resolves `cache.materialize` to catalog entities
fn materialize_set(catalog: &Catalog, configured: &[String]) -> Result<BTreeSet<EntityName>> {
    if configured.is_empty() {
        return Ok([Layer::Business, Layer::Metrics, Layer::Alerts]
            .into_iter()
            .flat_map(|layer| catalog.layer(layer))
            .collect());
    }
    configured
        .iter()
        .map(|name| {
            let parsed: EntityName = name.parse().map_err(|e: String| {
                SemanticError::Configuration(format!("cache.materialize: {}", e))
            })?;
            catalog.resolve(&parsed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::source::{MemorySource, SourceReader};
    use crate::config::SemanticConfig;
    use crate::core::cache::{MemorySnapshotStore, ReadMode};
    use crate::core::catalog::{EntityDefinition, Evaluator};
    use crate::core::relation::Aggregate;
    use crate::core::staging::{ColumnSpec, StagingModel};
    use crate::domain::{Column, DataType, Namespace, Value};
    use chrono::NaiveDate;

    fn staging(relation: &str, source: &str) -> EntityDefinition {
        EntityDefinition::staging(
            StagingModel::new(
                EntityName::new(Namespace::Staging, relation).unwrap(),
                vec![source.to_string()],
                vec![ColumnSpec::key("EmpID", DataType::Int)],
            ),
            relation,
        )
    }

    fn counter(name: &str, input: &'static str) -> EntityDefinition {
        EntityDefinition::derived(
            name.parse().unwrap(),
            name,
            vec![format!("staging.{}", input).parse().unwrap()],
            move |inputs, _ctx| inputs.get(input)?.group_by(&[], &[Aggregate::count("n")]),
        )
    }

    fn controller(materialize: Vec<String>) -> (Arc<MemorySource>, Arc<CacheController>) {
        let extracted = NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = |n: i64| {
            Table::from_rows(
                vec![Column::new("EmpID", DataType::Int)],
                (1..=n).map(|i| vec![Value::Int(i)]).collect(),
            )
            .unwrap()
        };
        let source = Arc::new(
            MemorySource::new(extracted)
                .with_table("A", table(2))
                .with_table("B", table(3)),
        );

        let catalog = Catalog::new(vec![
            staging("stg_a", "A"),
            staging("stg_b", "B"),
            counter("business.count_a", "stg_a"),
            counter("business.count_b", "stg_b"),
        ])
        .unwrap();

        let mut config = SemanticConfig::default();
        config.cache.materialize = materialize;
        let reader: Arc<dyn SourceReader + Send + Sync> = Arc::clone(&source) as _;
        let evaluator = Evaluator::new(
            Arc::new(catalog),
            reader,
            Arc::new(config),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );
        let controller = CacheController::new(evaluator, Arc::new(MemorySnapshotStore::new()));
        (source, Arc::new(controller))
    }

    #[tokio::test]
    async fn test_rebuild_materializes_default_layers() {
        let (_, controller) = controller(Vec::new());
        let coordinator = RebuildCoordinator::new(Arc::clone(&controller)).unwrap();
        let summary = coordinator.rebuild().await.unwrap();

        assert!(summary.is_successful());
        assert_eq!(summary.built.len(), 4);
        assert_eq!(summary.materialized.len(), 2);

        let listed = controller.store().list().await.unwrap();
        assert!(listed.iter().all(|m| m.entity.namespace() == Namespace::Business));
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_branch() {
        let (source, controller) = controller(Vec::new());
        let coordinator = RebuildCoordinator::new(Arc::clone(&controller)).unwrap();
        coordinator.rebuild().await.unwrap();

        source.fail_table("A");
        let summary = coordinator.rebuild().await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].entity.qualified(), "staging.stg_a");
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].qualified(), "business.count_a");
        assert!(summary.built.iter().any(|e| e.qualified() == "business.count_b"));

        let count_a = controller
            .get(&"business.count_a".parse().unwrap(), ReadMode::Cached)
            .await
            .unwrap();
        assert!(!count_a.freshness.is_live());
        assert_eq!(count_a.table.raw_rows()[0][0], Value::Int(2));
    }

    #[tokio::test]
    async fn test_materialize_list_is_resolved() {
        let (_, controller) = controller(vec!["count_b".to_string()]);
        let coordinator = RebuildCoordinator::new(controller).unwrap();
        let names: Vec<String> = coordinator
            .materialized_entities()
            .iter()
            .map(|e| e.qualified())
            .collect();
        assert_eq!(names, vec!["business.count_b"]);
    }

    #[test]
    fn test_unknown_materialize_entry_is_rejected() {
        let (_, controller) = controller(vec!["metrics.nope".to_string()]);
        assert!(RebuildCoordinator::new(controller).is_err());
    }
}
