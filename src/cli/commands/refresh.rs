//! Refresh command implementation
//!
//! Recomputes one entity, reading its upstream through existing snapshots,
//! and replaces its snapshot. A failed refresh keeps the previous snapshot.

use super::{controller_or_report, load_or_report};
use crate::domain::EntityName;
use clap::Args;

/// Arguments for the refresh command
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Entity to refresh (e.g. `metrics.headcount_metrics` or `cache.headcount_metrics`)
    pub entity: String,
}

impl RefreshArgs {
    /// Execute the refresh command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(entity = %self.entity, "Starting refresh command");

        let entity: EntityName = match self.entity.parse() {
            Ok(e) => e,
            Err(e) => {
                eprintln!("❌ Invalid entity name '{}': {}", self.entity, e);
                return Ok(2);
            }
        };

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let controller = match controller_or_report(config).await {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        match controller.refresh(&entity).await {
            Ok(meta) => {
                println!("✅ Refreshed {}", meta.entity);
                println!("  Rows: {}", meta.row_count);
                println!("  Run date: {}", meta.as_of);
                println!("  Refreshed at: {}", meta.refreshed_at.to_rfc3339());
                println!("  Checksum: {}", meta.checksum);
                Ok(0)
            }
            Err(e) => {
                eprintln!("❌ Refresh of {} failed; previous snapshot kept", entity);
                eprintln!("   Error: {e}");
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_rejects_invalid_entity_name() {
        let args = RefreshArgs {
            entity: "nowhere.thing".to_string(),
        };
        assert_eq!(args.execute("missing.toml").await.unwrap(), 2);
    }
}
