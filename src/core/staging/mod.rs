//! Staging layer: typed, canonically named projections of raw source tables
//!
//! - [`naming`] - column and raw table name normalisation
//! - [`cast`] - strict and best-effort type coercion
//! - [`model`] - declarative staging model and its evaluation
//! - [`models`] - the staging entities of the HR sources

pub mod cast;
pub mod model;
pub mod models;
pub mod naming;

pub use cast::{cast_value, Cast, CastPolicy};
pub use model::{ColumnSpec, Retention, StagingModel, StagingStats, LOADED_AT_COLUMN, SOURCE_COLUMN};
pub use models::staging_models;
