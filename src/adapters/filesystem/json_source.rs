//! Source reader over a directory of JSON files
//!
//! Serves two purposes: the remote source when `source.kind = "json"` (plain
//! JSON arrays of records, one file per table) and the local raw store in
//! import mode ([`RawTableFile`] documents).

use super::raw_store::RawTableFile;
use crate::adapters::source::traits::{SourceBatch, SourceReader, SourceRequest};
use crate::core::staging::naming::sanitize_table_name;
use crate::domain::{Result, SourceError, Table};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

pub struct JsonDirectorySource {
    dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Exact `<table>.json` first, then the sanitized name
    fn resolve(&self, table: &str) -> Option<PathBuf> {
        let exact = self.dir.join(format!("{}.json", table));
        if exact.is_file() {
            return Some(exact);
        }
        let sanitized = self.dir.join(format!("{}.json", sanitize_table_name(table)));
        sanitized.is_file().then_some(sanitized)
    }
}

fn parse_document(table: &str, bytes: &[u8], modified: NaiveDateTime) -> Result<SourceBatch> {
    let doc: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| SourceError::RawStore(format!("{}: invalid JSON: {}", table, e)))?;

    match doc {
        serde_json::Value::Array(items) => {
            let records = items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => Ok(map),
                    other => Err(SourceError::RawStore(format!(
                        "{}: expected an array of objects, found {}",
                        table, other
                    ))),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(SourceBatch {
                table: Table::from_json_records(&records),
                extracted_at: modified,
            })
        }
        serde_json::Value::Object(_) => {
            let file: RawTableFile = serde_json::from_value(doc)
                .map_err(|e| SourceError::RawStore(format!("{}: {}", table, e)))?;
            Ok(SourceBatch {
                table: file.table,
                extracted_at: file.extracted_at,
            })
        }
        _ => Err(SourceError::RawStore(format!("{}: unsupported document shape", table)).into()),
    }
}

#[async_trait]
impl SourceReader for JsonDirectorySource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| SourceError::ConnectionFailed(format!("{}: {}", self.dir.display(), e)))?;

        let mut tables = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourceBatch> {
        let path = self
            .resolve(&request.table)
            .ok_or_else(|| SourceError::TableNotFound(request.table.clone()))?;

        let bytes = tokio::fs::read(&path).await?;
        let modified = tokio::fs::metadata(&path)
            .await?
            .modified()
            .map(|t| DateTime::<Utc>::from(t).naive_utc())
            .unwrap_or_else(|_| Utc::now().naive_utc());

        let mut batch = parse_document(&request.table, &bytes, modified)?;
        if let Some(filter) = &request.since {
            batch.table = crate::adapters::source::apply_since(&batch.table, filter);
        }

        tracing::debug!(
            table = %request.table,
            path = %path.display(),
            rows = batch.table.len(),
            "Fetched table from JSON directory"
        );
        Ok(batch)
    }

    fn describe(&self) -> String {
        format!("json directory {}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::filesystem::RawStore;
    use crate::domain::{Column, DataType, Value};

    #[tokio::test]
    async fn test_fetch_plain_record_array() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Employee_Master.json"),
            r#"[{"EmpID": 100, "First Name": "Ann"}, {"EmpID": 101, "First Name": "Bo"}]"#,
        )
        .unwrap();

        let source = JsonDirectorySource::new(dir.path());
        let batch = source
            .fetch(&SourceRequest::table("Employee_Master"))
            .await
            .unwrap();
        assert_eq!(batch.table.len(), 2);
        assert_eq!(batch.table.column_names(), vec!["EmpID", "First Name"]);
        assert_eq!(source.list_tables().await.unwrap(), vec!["Employee_Master"]);
    }

    #[tokio::test]
    async fn test_fetch_raw_store_document_by_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = RawStore::new(dir.path(), dir.path().join("_metadata"));
        let extracted_at = chrono::NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let table = Table::from_rows(
            vec![Column::new("EmpID", DataType::Int)],
            vec![vec![Value::Int(7)]],
        )
        .unwrap();
        store
            .write_table(&RawTableFile {
                source_table: "CRMC_PayrollFile".to_string(),
                extracted_at,
                table: table.clone(),
            })
            .await
            .unwrap();

        let source = JsonDirectorySource::new(dir.path());
        let batch = source
            .fetch(&SourceRequest::table("CRMC_PayrollFile"))
            .await
            .unwrap();
        assert_eq!(batch.table, table);
        assert_eq!(batch.extracted_at, extracted_at);
    }

    #[tokio::test]
    async fn test_fetch_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirectorySource::new(dir.path());
        let err = source
            .fetch(&SourceRequest::table("Activity_Log"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Source table not found"));
    }
}
