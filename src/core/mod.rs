//! Core semantic layer logic.
//!
//! # Modules
//!
//! - [`relation`] - Joins, aggregation, calendar buckets and guarded ratios
//! - [`staging`] - Column naming, casting and the staging models
//! - [`business`] - Classification rule sets and the business entities
//! - [`metrics`] - Aggregated metric entities
//! - [`alerts`] - Threshold rules and the alert feed
//! - [`catalog`] - Entity definitions, dependency graph and evaluation
//! - [`cache`] - Snapshots, snapshot stores and the read-through controller
//! - [`refresh`] - Rebuild coordination and import mode
//! - [`verification`] - Snapshot checksums
//!
//! # Rebuild Workflow
//!
//! 1. **Plan**: Topologically level the catalog's dependency graph
//! 2. **Stage**: Fetch raw tables (federated or from the raw store) and type them
//! 3. **Compose**: Evaluate business, metrics and alert entities level by level
//! 4. **Materialize**: Atomically replace the configured snapshots
//! 5. **Report**: Log the rebuild summary with data-quality diagnostics
//!
//! # Example
//!
//! ```rust,no_run
//! use hrms_semantic::adapters::source::create_staging_source;
//! use hrms_semantic::config::load_config;
//! use hrms_semantic::core::cache::{open_snapshot_store, CacheController};
//! use hrms_semantic::core::catalog::{standard_catalog, Evaluator};
//! use hrms_semantic::core::refresh::RebuildCoordinator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(load_config("hrms.toml")?);
//! let catalog = Arc::new(standard_catalog(&config)?);
//! let reader = create_staging_source(&config).await?;
//! let evaluator = Evaluator::new(catalog, reader, Arc::clone(&config), config.pipeline.run_date());
//! let store = open_snapshot_store(&config).await?;
//! let controller = Arc::new(CacheController::new(evaluator, store));
//!
//! let summary = RebuildCoordinator::new(controller)?.rebuild().await?;
//! println!("Built: {}", summary.built.len());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod business;
pub mod cache;
pub mod catalog;
pub mod metrics;
pub mod refresh;
pub mod relation;
pub mod staging;
pub mod verification;
