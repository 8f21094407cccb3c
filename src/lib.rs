// HRMS Semantic Layer - staged HR views with selective materialization
// Copyright (c) 2025 HRMS Semantic Layer Contributors
// Licensed under the MIT License

//! # HRMS Semantic Layer
//!
//! A layered, declarative transformation pipeline over workforce, payroll and
//! attendance data. The same underlying facts are exposed through
//! progressively more business-legible entities, and any entity can be
//! materialized as a snapshot without changing what consumers see.
//!
//! ## Overview
//!
//! - **Staging** cleans and types raw source tables under one naming convention
//! - **Business** joins staging entities into analyst-facing views
//! - **Metrics** aggregates business entities into KPIs
//! - **Alerts** evaluates threshold rules into a prioritised feed
//! - **Materialization** snapshots any entity and serves reads through a
//!   single read-through controller that reports freshness
//!
//! Raw data arrives in one of two modes. In *import* mode the source tables
//! are copied to a local raw store and staging reads that copy; in
//! *federated* mode staging queries the source on every live evaluation.
//! Both modes produce identical entity shapes.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Catalog, layers, materialization and rebuild orchestration
//! - [`adapters`] - Source readers (PostgreSQL, JSON) and file-backed stores
//! - [`domain`] - Values, tables, entity names and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hrms_semantic::config::SemanticConfig;
//! use hrms_semantic::core::cache::{open_controller, ReadMode};
//! use hrms_semantic::core::refresh::RebuildCoordinator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SemanticConfig::from_file("hrms.toml")?;
//!     let controller = Arc::new(open_controller(Arc::new(config)).await?);
//!
//!     // Evaluate every layer and replace the configured snapshots
//!     let summary = RebuildCoordinator::new(Arc::clone(&controller))?
//!         .rebuild()
//!         .await?;
//!     println!("Built {} entities", summary.built.len());
//!
//!     // Served from the snapshot just written
//!     let alerts = controller
//!         .get(&"alerts.alert_feed".parse()?, ReadMode::Cached)
//!         .await?;
//!     println!("{} alerts ({})", alerts.table.len(), alerts.freshness);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], whose error type is
//! [`domain::SemanticError`]. The binary wraps them in `anyhow` and maps
//! failures to exit codes.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
