//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the semantic layer using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// HRMS Semantic Layer - staged HR views with selective materialization
#[derive(Parser, Debug)]
#[command(name = "hrms-semantic")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hrms.toml", env = "HRMS_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HRMS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy source tables into the local raw store (import mode)
    Import(commands::import::ImportArgs),

    /// Rebuild every layer and replace the configured snapshots
    Rebuild(commands::rebuild::RebuildArgs),

    /// Recompute one entity and replace its snapshot
    Refresh(commands::refresh::RefreshArgs),

    /// Read an entity through the cache controller
    Query(commands::query::QueryArgs),

    /// Show snapshot freshness and the latest refresh of every entity
    Status(commands::status::StatusArgs),

    /// List catalog entities in dependency order
    Entities(commands::entities::EntitiesArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
