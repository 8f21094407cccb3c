//! Rebuild command implementation
//!
//! Evaluates every layer in dependency order and replaces the snapshots
//! selected by `cache.materialize`.

use super::{controller_or_report, load_or_report};
use crate::core::refresh::RebuildCoordinator;
use chrono::NaiveDate;
use clap::Args;
use std::sync::Arc;

/// Arguments for the rebuild command
#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Override the run date (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Override the number of entities evaluated concurrently
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

impl RebuildArgs {
    /// Execute the rebuild command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting rebuild command");

        let mut config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if let Some(as_of) = self.as_of {
            tracing::info!(%as_of, "Overriding run date from CLI");
            config.pipeline.as_of = Some(as_of);
        }
        if let Some(max_parallel) = self.max_parallel {
            tracing::info!(max_parallel, "Overriding parallelism from CLI");
            config.pipeline.max_parallel = max_parallel;
        }
        if let Err(e) = config.validate() {
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let controller = match controller_or_report(config).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let coordinator = match RebuildCoordinator::new(Arc::clone(&controller)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Invalid cache.materialize: {e}");
                return Ok(2);
            }
        };

        println!(
            "🚀 Rebuilding for {} ({} snapshots selected)",
            controller.evaluator().as_of(),
            coordinator.materialized_entities().len()
        );
        println!();

        // Each snapshot is either fully replaced or untouched
        let summary = tokio::select! {
            result = coordinator.rebuild() => match result {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Rebuild failed");
                    eprintln!("Rebuild failed: {e}");
                    return Ok(5);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT (Ctrl+C), rebuild interrupted");
                println!();
                println!("⚠️  Rebuild interrupted. Completed snapshots were kept.");
                return Ok(130);
            }
        };

        println!("📊 Rebuild Summary:");
        println!("  Run date: {}", summary.as_of);
        println!("  Entities built: {}", summary.built.len());
        println!("  Snapshots replaced: {}", summary.materialized.len());
        println!("  Failed: {}", summary.failures.len());
        println!("  Skipped: {}", summary.skipped.len());
        println!("  Total rows: {}", summary.total_rows);
        println!("  Rejected rows: {}", summary.diagnostics.rejected_rows);
        println!("  Cast failures: {}", summary.diagnostics.cast_failures);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if !summary.diagnostics.fan_outs.is_empty() {
            println!("⚠️  Join fan-outs:");
            for fan_out in &summary.diagnostics.fan_outs {
                println!(
                    "  - {} ({}): {} extra rows",
                    fan_out.entity, fan_out.join, fan_out.extra_rows
                );
            }
            println!();
        }

        if !summary.failures.is_empty() {
            println!("⚠️  Errors encountered:");
            for failure in &summary.failures {
                println!("  - {}: {}", failure.entity, failure.message);
            }
            for entity in &summary.skipped {
                println!("  - {}: skipped after upstream failure", entity);
            }
            println!();
        }

        if summary.is_successful() {
            println!("✅ Rebuild completed successfully!");
            Ok(0)
        } else {
            println!("⚠️  Rebuild completed with failures");
            Ok(1)
        }
    }
}
