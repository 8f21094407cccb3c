//! Status command implementation
//!
//! This module implements the `status` command for displaying snapshot
//! freshness and the latest refresh outcome of every entity.

use super::{controller_or_report, load_or_report};
use crate::core::cache::{EntityStatus, Freshness};
use crate::domain::Namespace;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by layer (staging, business, metrics, alerts)
    #[arg(long)]
    pub layer: Option<String>,

    /// Only show entities that have a snapshot
    #[arg(long)]
    pub materialized: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking materialization status");

        let layer = match &self.layer {
            Some(raw) => match raw.parse::<Namespace>().map(|ns| ns.layer()) {
                Ok(Some(layer)) => Some(layer),
                _ => {
                    eprintln!("❌ Unknown layer '{}'", raw);
                    return Ok(2);
                }
            },
            None => None,
        };

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let controller = match controller_or_report(config).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let statuses = match controller.status().await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read snapshot store");
                eprintln!("   Error: {}", e);
                return Ok(5);
            }
        };

        let filtered: Vec<&EntityStatus> = statuses
            .iter()
            .filter(|s| layer.is_none() || s.layer == layer)
            .filter(|s| !self.materialized || s.snapshot.is_some())
            .collect();

        println!("📊 Materialization Status (run date {})", controller.evaluator().as_of());
        println!();

        if filtered.is_empty() {
            println!("No entities match the specified filters.");
            return Ok(0);
        }

        println!(
            "{:<42} {:<10} {:>8} {:<22} {:<12} {}",
            "Entity", "Layer", "Rows", "Refreshed", "Freshness", "Last Refresh"
        );
        println!("{}", "-".repeat(120));

        for status in filtered {
            let layer = status.layer.map_or("-".to_string(), |l| l.to_string());
            let (rows, refreshed) = match &status.snapshot {
                Some(meta) => (
                    meta.row_count.to_string(),
                    meta.refreshed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ),
                None => ("-".to_string(), "Never".to_string()),
            };
            let last = status
                .last_refresh
                .as_ref()
                .map_or("-".to_string(), |r| r.status.to_string());

            println!(
                "{:<42} {:<10} {:>8} {:<22} {:<12} {}",
                status.entity.qualified(),
                layer,
                rows,
                refreshed,
                freshness_label(status.freshness.as_ref()),
                last
            );
        }

        println!();
        Ok(0)
    }
}

fn freshness_label(freshness: Option<&Freshness>) -> &'static str {
    match freshness {
        None => "live only",
        Some(Freshness::Live { .. }) => "live",
        Some(Freshness::Snapshot {
            upstream_newer: true,
            ..
        }) => "stale",
        Some(Freshness::Snapshot { expired: true, .. }) => "expired",
        Some(Freshness::Snapshot { .. }) => "fresh",
    }
}
