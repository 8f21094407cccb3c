//! Entities command implementation
//!
//! Lists the catalog in dependency order. Only configuration is needed;
//! neither the source nor the snapshot store is opened.

use super::load_or_report;
use crate::core::catalog::standard_catalog;
use crate::domain::Namespace;
use clap::Args;

/// Arguments for the entities command
#[derive(Args, Debug)]
pub struct EntitiesArgs {
    /// Filter by layer (staging, business, metrics, alerts)
    #[arg(long)]
    pub layer: Option<String>,

    /// Show upstream dependencies
    #[arg(long)]
    pub dependencies: bool,
}

impl EntitiesArgs {
    /// Execute the entities command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
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
        let catalog = match standard_catalog(&config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to build catalog: {e}");
                return Ok(5);
            }
        };

        for definition in catalog.entities() {
            if layer.is_some() && definition.name.layer() != layer {
                continue;
            }
            println!("{:<42} {}", definition.name.qualified(), definition.description);
            if self.dependencies {
                for dep in &definition.dependencies {
                    println!("    <- {}", dep);
                }
            }
        }
        Ok(0)
    }
}
