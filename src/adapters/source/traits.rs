//! Upstream source abstraction
//!
//! Staging reads raw relations only through [`SourceReader`], so federated
//! reads against the remote database and reads from the local raw store
//! yield identical staging shapes.

use crate::domain::{Result, Table};
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Lower bound on a timestamp column, pushed down to the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinceFilter {
    /// Raw column name as it appears in the source
    pub column: String,

    /// Rows with `column >= cutoff` are returned
    pub cutoff: NaiveDateTime,
}

/// Request for one raw table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    /// Raw table name as configured (e.g. `Employee_Master`)
    pub table: String,

    /// Optional retention filter
    pub since: Option<SinceFilter>,
}

impl SourceRequest {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            since: None,
        }
    }

    pub fn since(mut self, column: impl Into<String>, cutoff: NaiveDateTime) -> Self {
        self.since = Some(SinceFilter {
            column: column.into(),
            cutoff,
        });
        self
    }
}

/// A fetched raw relation plus its extraction time
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub table: Table,

    /// When the rows were read from the system of record
    pub extracted_at: NaiveDateTime,
}

/// Reader over raw source tables
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Lists the tables the source exposes
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Fetches one table, applying the pushed-down filter when present
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::TableNotFound`](crate::domain::SourceError::TableNotFound)
    /// for unknown tables and other source errors for connection or decode
    /// failures.
    async fn fetch(&self, request: &SourceRequest) -> Result<SourceBatch>;

    /// Short human-readable description for logs and status output
    fn describe(&self) -> String;
}
