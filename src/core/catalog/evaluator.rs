//! Single-entity evaluation
//!
//! Staging entities fetch their raw batches through the [`SourceReader`];
//! derived entities run their derive function on the blocking pool. Callers
//! supply upstream inputs, so the same evaluator serves both the rebuild
//! coordinator and live reads through the cache controller.

use super::definition::{BuildContext, Compute, Diagnostics, Inputs};
use super::Catalog;
use crate::adapters::source::traits::SourceReader;
use crate::config::SemanticConfig;
use crate::domain::{EntityName, Result, SemanticError, Table};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of evaluating one entity
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub table: Table,
    pub diagnostics: Diagnostics,
    pub duration: Duration,
}

#[derive(Clone)]
pub struct Evaluator {
    catalog: Arc<Catalog>,
    reader: Arc<dyn SourceReader + Send + Sync>,
    config: Arc<SemanticConfig>,
    as_of: NaiveDate,
}

impl Evaluator {
    pub fn new(
        catalog: Arc<Catalog>,
        reader: Arc<dyn SourceReader + Send + Sync>,
        config: Arc<SemanticConfig>,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            catalog,
            reader,
            config,
            as_of,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn config(&self) -> &Arc<SemanticConfig> {
        &self.config
    }

    pub fn reader(&self) -> &Arc<dyn SourceReader + Send + Sync> {
        &self.reader
    }

    /// Evaluates `entity` from the given upstream inputs
    ///
    /// # Errors
    ///
    /// Staging entities propagate source and schema errors; derived entities
    /// propagate whatever their derive function returns. A missing input is a
    /// catalog error.
    pub async fn evaluate(&self, entity: &EntityName, inputs: Inputs) -> Result<Evaluated> {
        let definition = self.catalog.get(entity)?;
        let started = Instant::now();
        crate::log_build_start!(entity);

        let (table, diagnostics) = match &definition.compute {
            Compute::Staging(model) => {
                let mut batches = Vec::with_capacity(model.sources.len());
                for request in model.requests(self.as_of) {
                    let batch = self.reader.fetch(&request).await?;
                    batches.push((request.table, batch));
                }

                let model = Arc::clone(model);
                let as_of = self.as_of;
                let (table, stats) =
                    tokio::task::spawn_blocking(move || model.transform(&batches, as_of))
                        .await
                        .map_err(|e| SemanticError::evaluation(entity.to_string(), e.to_string()))??;

                let mut diagnostics = Diagnostics::default();
                diagnostics.add_staging(&stats);
                (table, diagnostics)
            }
            Compute::Derived(derive) => {
                for dep in &definition.dependencies {
                    inputs.get(&dep.qualified())?;
                }
                let derive = Arc::clone(derive);
                let mut ctx = BuildContext::new(entity.clone(), self.as_of, Arc::clone(&self.config));
                tokio::task::spawn_blocking(move || {
                    let table = derive(&inputs, &mut ctx)?;
                    Ok::<_, SemanticError>((table, ctx.diagnostics))
                })
                .await
                .map_err(|e| SemanticError::evaluation(entity.to_string(), e.to_string()))??
            }
        };

        let duration = started.elapsed();
        crate::log_build_complete!(entity, table.len(), duration);
        Ok(Evaluated {
            table,
            diagnostics,
            duration,
        })
    }
}
