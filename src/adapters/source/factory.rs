//! Source reader factory
//!
//! Builds source readers based on configuration.

use super::traits::SourceReader;
use crate::adapters::filesystem::JsonDirectorySource;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLSource};
use crate::config::schema::{SemanticConfig, SourceKind, SourceMode};
use crate::domain::{Result, SemanticError};
use std::sync::Arc;

/// Create a reader over the system of record
///
/// # Errors
///
/// Returns an error if the reader cannot be created (e.g. the connection
/// pool cannot be built).
pub async fn create_remote_source(
    config: &SemanticConfig,
) -> Result<Arc<dyn SourceReader + Send + Sync>> {
    match config.source.kind {
        SourceKind::PostgreSQL => {
            let pg_config = config.source.postgresql.as_ref().ok_or_else(|| {
                SemanticError::Configuration(
                    "source.postgresql configuration is required when source.kind = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!(schema = %pg_config.schema, "Creating PostgreSQL source");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgreSQLSource::new(client)) as Arc<dyn SourceReader + Send + Sync>)
        }
        SourceKind::Json => {
            tracing::info!(path = %config.source.json_path, "Creating JSON directory source");
            Ok(Arc::new(JsonDirectorySource::new(&config.source.json_path))
                as Arc<dyn SourceReader + Send + Sync>)
        }
    }
}

/// Create the reader staging evaluates against
///
/// Federated mode reads the remote source directly; import mode reads the
/// local raw store populated by `import`.
pub async fn create_staging_source(
    config: &SemanticConfig,
) -> Result<Arc<dyn SourceReader + Send + Sync>> {
    match config.source.mode {
        SourceMode::Federated => create_remote_source(config).await,
        SourceMode::Import => {
            let raw_dir = config.raw_dir();
            tracing::debug!(path = %raw_dir.display(), "Reading staging from local raw store");
            Ok(Arc::new(JsonDirectorySource::new(raw_dir)) as Arc<dyn SourceReader + Send + Sync>)
        }
    }
}
