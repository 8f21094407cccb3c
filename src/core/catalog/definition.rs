//! Entity definitions and the build context passed to derive functions

use crate::config::SemanticConfig;
use crate::core::relation::JoinStats;
use crate::core::staging::{StagingModel, StagingStats};
use crate::domain::{EntityName, Result, SemanticError, Table};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Pure function from upstream relations to the entity's relation
pub type DeriveFn = Arc<dyn Fn(&Inputs, &mut BuildContext) -> Result<Table> + Send + Sync>;

/// How an entity is computed
#[derive(Clone)]
pub enum Compute {
    /// Read and stage raw source tables
    Staging(Arc<StagingModel>),
    /// Derive from upstream entities
    Derived(DeriveFn),
}

impl fmt::Debug for Compute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compute::Staging(model) => f.debug_tuple("Staging").field(&model.sources).finish(),
            Compute::Derived(_) => f.write_str("Derived"),
        }
    }
}

/// A named relation in the catalog
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub name: EntityName,
    pub description: String,
    /// Upstream entities; empty for staging entities
    pub dependencies: Vec<EntityName>,
    pub compute: Compute,
}

impl EntityDefinition {
    pub fn staging(model: StagingModel, description: impl Into<String>) -> Self {
        Self {
            name: model.entity.clone(),
            description: description.into(),
            dependencies: Vec::new(),
            compute: Compute::Staging(Arc::new(model)),
        }
    }

    pub fn derived<F>(
        name: EntityName,
        description: impl Into<String>,
        dependencies: Vec<EntityName>,
        derive: F,
    ) -> Self
    where
        F: Fn(&Inputs, &mut BuildContext) -> Result<Table> + Send + Sync + 'static,
    {
        Self {
            name,
            description: description.into(),
            dependencies,
            compute: Compute::Derived(Arc::new(derive)),
        }
    }

    pub fn is_staging(&self) -> bool {
        matches!(self.compute, Compute::Staging(_))
    }
}

/// Upstream relations handed to a derive function
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    tables: BTreeMap<EntityName, Arc<Table>>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: EntityName, table: Arc<Table>) {
        self.tables.insert(name, table);
    }

    /// Looks up an input by relation name (`employee_summary`) or qualified
    /// name (`business.employee_summary`)
    pub fn get(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|(k, _)| k.relation() == name || k.qualified() == name)
            .map(|(_, t)| t.as_ref())
            .ok_or_else(|| SemanticError::Catalog(format!("input '{}' was not provided", name)))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A join that produced more rows than its left input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub entity: EntityName,
    pub join: String,
    pub extra_rows: usize,
}

/// Data-quality counters gathered during one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub rejected_rows: usize,
    pub cast_failures: usize,
    pub retention_dropped: usize,
    pub fan_outs: Vec<FanOut>,
}

impl Diagnostics {
    pub fn merge(&mut self, other: &Diagnostics) {
        self.rejected_rows += other.rejected_rows;
        self.cast_failures += other.cast_failures;
        self.retention_dropped += other.retention_dropped;
        self.fan_outs.extend(other.fan_outs.iter().cloned());
    }

    pub fn add_staging(&mut self, stats: &StagingStats) {
        self.rejected_rows += stats.rejected_rows;
        self.cast_failures += stats.cast_failures;
        self.retention_dropped += stats.retention_dropped;
    }

    pub fn is_clean(&self) -> bool {
        self.rejected_rows == 0 && self.cast_failures == 0 && self.fan_outs.is_empty()
    }
}

/// Per-build context: run date, configuration and diagnostics sink
pub struct BuildContext {
    pub entity: EntityName,
    pub as_of: NaiveDate,
    pub config: Arc<SemanticConfig>,
    pub diagnostics: Diagnostics,
}

impl BuildContext {
    pub fn new(entity: EntityName, as_of: NaiveDate, config: Arc<SemanticConfig>) -> Self {
        Self {
            entity,
            as_of,
            config,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Records a join's statistics; fan-out is reported, not treated as an error
    pub fn record_join(&mut self, label: &str, stats: &JoinStats) {
        if stats.has_fan_out() {
            tracing::warn!(
                entity = %self.entity,
                join = label,
                left_rows = stats.left_rows,
                output_rows = stats.output_rows,
                "Join fan-out detected"
            );
            self.diagnostics.fan_outs.push(FanOut {
                entity: self.entity.clone(),
                join: label.to_string(),
                extra_rows: stats.fan_out_rows,
            });
        }
    }
}
