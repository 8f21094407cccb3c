//! CLI command implementations
//!
//! This module contains all CLI command implementations.
//!
//! Exit codes: 0 success, 1 partial failure, 2 configuration error,
//! 4 source connection error, 5 fatal error, 130 interrupted.

pub mod entities;
pub mod import;
pub mod init;
pub mod query;
pub mod rebuild;
pub mod refresh;
pub mod status;
pub mod validate;

use crate::config::{load_config, SemanticConfig};
use crate::core::cache::{open_controller, CacheController};
use std::sync::Arc;

/// Loads configuration, printing the failure and mapping it to exit code 2
pub(crate) fn load_or_report(config_path: &str) -> Result<SemanticConfig, i32> {
    load_config(config_path).map_err(|e| {
        tracing::error!(error = %e, config_path = %config_path, "Failed to load configuration");
        eprintln!("❌ Failed to load configuration file");
        eprintln!("   Error: {e}");
        2
    })
}

/// Opens the cache controller, mapping failures to exit code 4
pub(crate) async fn controller_or_report(
    config: SemanticConfig,
) -> Result<Arc<CacheController>, i32> {
    match open_controller(Arc::new(config)).await {
        Ok(controller) => Ok(Arc::new(controller)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open cache controller");
            eprintln!("❌ Failed to open source or snapshot store");
            eprintln!("   Error: {e}");
            Err(4)
        }
    }
}
