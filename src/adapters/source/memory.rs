//! In-memory source for tests and embedding

use super::traits::{SourceBatch, SourceReader, SourceRequest};
use crate::domain::{Result, SourceError, Table};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// Source backed by tables held in memory
///
/// Tables can be replaced between refreshes and individual tables can be
/// switched into a failing state to simulate upstream outages.
pub struct MemorySource {
    tables: RwLock<BTreeMap<String, Table>>,
    failing: RwLock<BTreeSet<String>>,
    extracted_at: NaiveDateTime,
}

impl MemorySource {
    /// Creates an empty source whose batches report `extracted_at`
    pub fn new(extracted_at: NaiveDateTime) -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(BTreeSet::new()),
            extracted_at,
        }
    }

    /// Adds or replaces a table
    pub fn insert(&self, name: impl Into<String>, table: Table) {
        if let Ok(mut tables) = self.tables.write() {
            tables.insert(name.into(), table);
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_table(self, name: impl Into<String>, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    /// Makes every fetch of `name` fail until [`recover`](Self::recover)
    pub fn fail_table(&self, name: impl Into<String>) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(name.into());
        }
    }

    pub fn recover(&self, name: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.remove(name);
        }
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| SourceError::QueryFailed("source lock poisoned".to_string()))?;
        Ok(tables.keys().cloned().collect())
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourceBatch> {
        let failing = self
            .failing
            .read()
            .map_err(|_| SourceError::QueryFailed("source lock poisoned".to_string()))?
            .contains(&request.table);
        if failing {
            return Err(SourceError::ConnectionFailed(format!(
                "simulated outage reading {}",
                request.table
            ))
            .into());
        }

        let table = self
            .tables
            .read()
            .map_err(|_| SourceError::QueryFailed("source lock poisoned".to_string()))?
            .get(&request.table)
            .cloned()
            .ok_or_else(|| SourceError::TableNotFound(request.table.clone()))?;

        let table = match &request.since {
            Some(filter) => super::apply_since(&table, filter),
            None => table,
        };

        Ok(SourceBatch {
            table,
            extracted_at: self.extracted_at,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
