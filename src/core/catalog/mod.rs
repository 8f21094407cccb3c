//! Entity catalog
//!
//! Every relation the semantic layer exposes is declared here as an
//! [`EntityDefinition`]: a name, its upstream dependencies and a pure compute
//! function. The catalog validates the dependency graph on construction.
//!
//! ```rust
//! use hrms_semantic::config::SemanticConfig;
//! use hrms_semantic::core::catalog::standard_catalog;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = standard_catalog(&SemanticConfig::default())?;
//! let plan = catalog.graph().levels();
//! assert!(!plan.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod definition;
pub mod evaluator;
pub mod graph;

pub use definition::{BuildContext, Compute, DeriveFn, Diagnostics, EntityDefinition, FanOut, Inputs};
pub use evaluator::{Evaluated, Evaluator};
pub use graph::EntityGraph;

use crate::config::SemanticConfig;
use crate::core::staging::models as staging;
use crate::domain::{EntityName, Layer, Namespace, Result, SemanticError};
use std::collections::BTreeMap;

/// Validated set of entity definitions
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: BTreeMap<EntityName, EntityDefinition>,
    graph: EntityGraph,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns [`SemanticError::Catalog`] for duplicate names, unknown
    /// dependencies, layer violations and cycles.
    pub fn new(definitions: Vec<EntityDefinition>) -> Result<Self> {
        let graph = EntityGraph::build(&definitions)?;
        let definitions = definitions
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Ok(Self { definitions, graph })
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn get(&self, entity: &EntityName) -> Result<&EntityDefinition> {
        self.definitions
            .get(entity)
            .ok_or_else(|| SemanticError::Catalog(format!("unknown entity {}", entity)))
    }

    pub fn contains(&self, entity: &EntityName) -> bool {
        self.definitions.contains_key(entity)
    }

    /// Definitions in dependency order
    pub fn entities(&self) -> Vec<&EntityDefinition> {
        self.graph
            .topological_order()
            .iter()
            .filter_map(|name| self.definitions.get(name))
            .collect()
    }

    /// Entities of one layer, by name
    pub fn layer(&self, layer: Layer) -> Vec<EntityName> {
        self.definitions
            .keys()
            .filter(|n| n.layer() == Some(layer))
            .cloned()
            .collect()
    }

    /// Resolves a user-supplied name to a defined entity
    ///
    /// `cache.<relation>` maps to the defined entity with that relation name
    /// (searched business, metrics, alerts, then staging). Other names must
    /// be defined as given.
    pub fn resolve(&self, entity: &EntityName) -> Result<EntityName> {
        if !entity.is_cache_alias() {
            self.get(entity)?;
            return Ok(entity.clone());
        }
        [
            Namespace::Business,
            Namespace::Metrics,
            Namespace::Alerts,
            Namespace::Staging,
        ]
        .iter()
        .filter_map(|ns| EntityName::new(*ns, entity.relation()).ok())
        .find(|candidate| self.contains(candidate))
        .ok_or_else(|| {
            SemanticError::Catalog(format!(
                "{} does not name a materializable entity",
                entity
            ))
        })
    }
}

/// The full HR catalog: staging, business, metrics and alerts
pub fn standard_catalog(config: &SemanticConfig) -> Result<Catalog> {
    let mut definitions: Vec<EntityDefinition> = vec![
        EntityDefinition::staging(
            staging::stg_employees(&config.source.tables)?,
            "Workforce master, one row per employee",
        ),
        EntityDefinition::staging(
            staging::stg_payroll(&config.source.tables)?,
            "Payroll and benefit lines per pay date",
        ),
        EntityDefinition::staging(
            staging::stg_attendance(&config.source.tables)?,
            "Attendance rows unioned across time-boxed batches",
        ),
        EntityDefinition::staging(
            staging::stg_activity_log(&config.source.tables, &config.pipeline)?,
            "Application activity within the retention window",
        ),
    ];
    definitions.extend(crate::core::business::definitions()?);
    definitions.extend(crate::core::metrics::definitions()?);
    definitions.extend(crate::core::alerts::definitions()?);
    Catalog::new(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_builds() {
        let catalog = standard_catalog(&SemanticConfig::default()).unwrap();
        assert_eq!(catalog.layer(Layer::Staging).len(), 4);
        assert_eq!(catalog.layer(Layer::Business).len(), 4);
        assert_eq!(catalog.layer(Layer::Metrics).len(), 8);
        assert_eq!(catalog.layer(Layer::Alerts).len(), 1);

        let order = catalog.graph().topological_order();
        let pos = |n: &str| order.iter().position(|e| e.qualified() == n).unwrap();
        assert!(pos("staging.stg_employees") < pos("business.employee_summary"));
        assert!(pos("business.employee_summary") < pos("business.clinical_staff_summary"));
        assert!(pos("metrics.attendance_metrics") < pos("alerts.alert_feed"));
    }

    #[test]
    fn test_resolve_cache_alias() {
        let catalog = standard_catalog(&SemanticConfig::default()).unwrap();
        let alias: EntityName = "cache.headcount_metrics".parse().unwrap();
        assert_eq!(
            catalog.resolve(&alias).unwrap().qualified(),
            "metrics.headcount_metrics"
        );
        assert!(catalog.resolve(&"cache.nope".parse().unwrap()).is_err());
        assert!(catalog.resolve(&"business.nope".parse().unwrap()).is_err());
    }
}
