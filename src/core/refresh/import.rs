//! Import mode: copy source tables into the local raw store
//!
//! Each configured table is fetched with the same retention push-down
//! staging would apply, written as one JSON document and logged. A failed
//! table is logged and does not stop the others.

use crate::adapters::filesystem::{ImportLogEntry, RawStore, RawTableFile};
use crate::adapters::source::traits::SourceReader;
use crate::config::SemanticConfig;
use crate::core::staging::staging_models;
use crate::domain::Result;
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Outcome of one imported table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTable {
    pub table: String,
    pub rows: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub imported: Vec<ImportedTable>,
    /// `(table, error message)`
    pub failed: Vec<(String, String)>,
    pub duration: Duration,
}

impl ImportSummary {
    pub fn is_successful(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.imported.iter().map(|t| t.rows).sum()
    }
}

/// Copies every configured source table into `store`
///
/// # Errors
///
/// Only configuration errors abort the import; per-table failures are
/// recorded in the summary and the import log.
pub async fn import_tables(
    config: &SemanticConfig,
    source: &(dyn SourceReader + Send + Sync),
    store: &RawStore,
    as_of: NaiveDate,
) -> Result<ImportSummary> {
    let started = Instant::now();
    let mut summary = ImportSummary::default();
    let models = staging_models(&config.source.tables, &config.pipeline)?;

    tracing::info!(source = %source.describe(), target = %store.raw_dir().display(), "Starting import");

    for request in models.iter().flat_map(|m| m.requests(as_of)) {
        let imported_at = Utc::now();
        let outcome = async {
            let batch = source.fetch(&request).await?;
            let file = RawTableFile {
                source_table: request.table.clone(),
                extracted_at: batch.extracted_at,
                table: batch.table,
            };
            let path = store.write_table(&file).await?;
            Ok::<_, crate::domain::SemanticError>((file.table.len(), path))
        }
        .await;

        match outcome {
            Ok((rows, path)) => {
                tracing::info!(table = %request.table, rows, path = %path.display(), "Imported table");
                store
                    .append_log(ImportLogEntry::success(&request.table, imported_at, rows))
                    .await?;
                summary.imported.push(ImportedTable {
                    table: request.table.clone(),
                    rows,
                    path,
                });
            }
            Err(e) => {
                tracing::error!(table = %request.table, error = %e, "Failed to import table");
                store
                    .append_log(ImportLogEntry::error(&request.table, imported_at, &e.to_string()))
                    .await?;
                summary.failed.push((request.table.clone(), e.to_string()));
            }
        }
    }

    summary.duration = started.elapsed();
    tracing::info!(
        imported = summary.imported.len(),
        failed = summary.failed.len(),
        rows = summary.total_rows(),
        duration_ms = summary.duration.as_millis() as u64,
        "Import completed"
    );
    Ok(summary)
}
