//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the semantic layer configuration file.

use crate::config::{load_config, SourceKind};
use crate::core::catalog::standard_catalog;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates; the catalog is also built so that a bad
    /// table name surfaces here rather than during a rebuild.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let catalog = match standard_catalog(&config) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Catalog could not be built from this configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Source Mode: {:?}", config.source.mode);
        match config.source.kind {
            SourceKind::Json => println!("  Source: JSON directory {}", config.source.json_path),
            SourceKind::PostgreSQL => {
                if let Some(ref pg_config) = config.source.postgresql {
                    println!(
                        "  Source: PostgreSQL {} (schema {})",
                        pg_config.connection_string.expose_secret().redacted(),
                        pg_config.schema
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }
        println!("  Employee Table: {}", config.source.tables.employees);
        println!("  Payroll Table: {}", config.source.tables.payroll);
        println!(
            "  Attendance Tables: {}",
            config.source.tables.attendance.join(", ")
        );
        println!("  Activity Log Table: {}", config.source.tables.activity_log);
        println!("  Data Directory: {}", config.pipeline.data_dir);
        println!("  Run Date: {}", config.pipeline.run_date());
        println!("  Activity Retention: {} days", config.pipeline.activity_log_days);
        println!("  Max Parallel: {}", config.pipeline.max_parallel);
        println!("  Cache Enabled: {}", config.cache.enabled);
        println!("  Cache Directory: {}", config.cache_dir().display());
        println!(
            "  Materialize: {}",
            if config.cache.materialize.is_empty() {
                "business, metrics and alerts layers".to_string()
            } else {
                config.cache.materialize.join(", ")
            }
        );
        println!("  Catalog Entities: {}", catalog.entities().len());
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_accepts_defaults_and_rejects_bad_config() {
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "[pipeline]\nactivity_log_days = 14").unwrap();
        let path = good.path().to_string_lossy().to_string();
        assert_eq!(ValidateArgs {}.execute(&path).await.unwrap(), 0);

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "[logging]\nlocal_rotation = \"weekly\"").unwrap();
        let path = bad.path().to_string_lossy().to_string();
        assert_eq!(ValidateArgs {}.execute(&path).await.unwrap(), 2);
    }
}
