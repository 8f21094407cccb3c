//! Configuration management for the semantic layer.
//!
//! # Overview
//!
//! Configuration is a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `HRMS_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation with descriptive messages
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hrms_semantic::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hrms.toml")?;
//! println!("Source mode: {:?}", config.source.mode);
//! println!("Snapshots: {}", config.cache_dir().display());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`SourceConfig`] - Federated or import mode, source kind, raw table names
//! - [`PipelineConfig`] - Data directory, run date, retention, parallelism
//! - [`AlertConfig`] - Alert rule thresholds
//! - [`CacheConfig`] - Materialization list and expiry
//! - [`LoggingConfig`] - File logging
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! mode = "import"
//! kind = "postgresql"
//!
//! [source.postgresql]
//! connection_string = "${HRMS_PG_URL}"
//! schema = "dbo"
//!
//! [pipeline]
//! data_dir = "./data"
//! activity_log_days = 30
//!
//! [cache]
//! materialize = ["business.employee_summary", "metrics.monthly_payroll_metrics"]
//! max_age_minutes = 1440
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    AlertConfig, ApplicationConfig, CacheConfig, LoggingConfig, PipelineConfig, PostgreSQLConfig,
    SemanticConfig, SourceConfig, SourceKind, SourceMode, SourceTablesConfig, Thresholds,
};
pub use secret::{secret_string, SecretString, SecretValue};

impl SemanticConfig {
    /// Loads configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::domain::Result<Self> {
        load_config(path)
    }
}
