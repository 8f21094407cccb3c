//! Import command implementation
//!
//! Copies the configured source tables into the local raw store that
//! staging reads in import mode.

use super::load_or_report;
use crate::adapters::filesystem::RawStore;
use crate::adapters::source::create_remote_source;
use crate::config::SourceMode;
use crate::core::refresh::import_tables;
use chrono::NaiveDate;
use clap::Args;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Override the run date used for the retention window (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

impl ImportArgs {
    /// Execute the import command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting import command");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if config.source.mode == SourceMode::Federated {
            tracing::warn!("source.mode is federated; imported tables are not read by staging");
            println!("⚠️  source.mode is 'federated': staging reads the source directly");
            println!();
        }

        let source = match create_remote_source(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create source reader");
                eprintln!("❌ Failed to connect to source: {e}");
                return Ok(4);
            }
        };

        let store = RawStore::new(config.raw_dir(), config.metadata_dir());
        let as_of = self.as_of.unwrap_or_else(|| config.pipeline.run_date());

        println!("📥 Importing from {}", source.describe());
        println!();

        let summary = match import_tables(&config, source.as_ref(), &store, as_of).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Import failed");
                eprintln!("Import failed: {e}");
                return Ok(5);
            }
        };

        for table in &summary.imported {
            println!("  ✅ {:<30} {:>8} rows", table.table, table.rows);
        }
        for (table, message) in &summary.failed {
            println!("  ❌ {:<30} {}", table, message);
        }

        println!();
        println!("📊 Import Summary:");
        println!("  Tables imported: {}", summary.imported.len());
        println!("  Tables failed: {}", summary.failed.len());
        println!("  Total rows: {}", summary.total_rows());
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if summary.is_successful() {
            println!("✅ Import completed successfully!");
            Ok(0)
        } else {
            println!("⚠️  Import completed with failures");
            Ok(1)
        }
    }
}
