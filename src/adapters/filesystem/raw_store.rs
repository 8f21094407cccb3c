//! Local raw store for import mode
//!
//! Imported tables land in `<data_dir>/raw/<sanitized>.json`, one document per
//! source table, and every import attempt appends an entry to
//! `<data_dir>/_metadata/import_log.json`.

use super::{read_json, write_json_atomic};
use crate::core::staging::naming::sanitize_table_name;
use crate::domain::{Result, Table};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const IMPORT_LOG_FILE: &str = "import_log.json";

/// A source table as copied into the raw store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTableFile {
    /// Table name in the system of record
    pub source_table: String,
    pub extracted_at: NaiveDateTime,
    pub table: Table,
}

/// One import attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub table_name: String,
    pub imported_at: DateTime<Utc>,
    pub row_count: usize,
    /// `success` or `error: <message>`
    pub status: String,
}

impl ImportLogEntry {
    pub fn success(table_name: &str, imported_at: DateTime<Utc>, row_count: usize) -> Self {
        Self {
            table_name: table_name.to_string(),
            imported_at,
            row_count,
            status: "success".to_string(),
        }
    }

    pub fn error(table_name: &str, imported_at: DateTime<Utc>, message: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            imported_at,
            row_count: 0,
            status: format!("error: {}", message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Writer side of the raw store
pub struct RawStore {
    raw_dir: PathBuf,
    metadata_dir: PathBuf,
    log_lock: Mutex<()>,
}

impl RawStore {
    pub fn new(raw_dir: impl Into<PathBuf>, metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            metadata_dir: metadata_dir.into(),
            log_lock: Mutex::new(()),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// File a source table is stored under
    pub fn table_path(&self, source_table: &str) -> PathBuf {
        self.raw_dir
            .join(format!("{}.json", sanitize_table_name(source_table)))
    }

    /// Replaces the stored copy of a table
    pub async fn write_table(&self, file: &RawTableFile) -> Result<PathBuf> {
        let path = self.table_path(&file.source_table);
        write_json_atomic(&path, file).await?;
        tracing::debug!(
            table = %file.source_table,
            path = %path.display(),
            rows = file.table.len(),
            "Raw table written"
        );
        Ok(path)
    }

    /// Appends an entry to the import log
    pub async fn append_log(&self, entry: ImportLogEntry) -> Result<()> {
        let _guard = self.log_lock.lock().await;
        let path = self.metadata_dir.join(IMPORT_LOG_FILE);
        let mut entries: Vec<ImportLogEntry> = read_json(&path).await?.unwrap_or_default();
        entries.push(entry);
        write_json_atomic(&path, &entries).await
    }

    /// Full import history, oldest first
    pub async fn import_log(&self) -> Result<Vec<ImportLogEntry>> {
        Ok(read_json(&self.metadata_dir.join(IMPORT_LOG_FILE))
            .await?
            .unwrap_or_default())
    }
}
