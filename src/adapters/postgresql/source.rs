//! PostgreSQL implementation of [`SourceReader`]
//!
//! Column metadata comes from preparing the table query; rows are pulled as
//! `row_to_json` documents and coerced to the declared column types. The
//! retention filter is pushed into the `WHERE` clause.

use super::client::PostgreSQLClient;
use crate::adapters::source::traits::{SourceBatch, SourceReader, SourceRequest};
use crate::core::staging::cast::{cast_value, Cast, CastPolicy};
use crate::domain::{Column, DataType, Result, SourceError, Table, Value};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio_postgres::types::Type;

pub struct PostgreSQLSource {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLSource {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Builds the table query, with a `$1` timestamp bound when filtering
fn table_query(schema: &str, table: &str, since_column: Option<&str>) -> String {
    let mut sql = format!("SELECT * FROM {}.{}", quote_ident(schema), quote_ident(table));
    if let Some(column) = since_column {
        sql.push_str(&format!(
            " WHERE {}::timestamp >= $1::timestamp",
            quote_ident(column)
        ));
    }
    sql
}

fn data_type_for(pg_type: &Type) -> DataType {
    match *pg_type {
        Type::BOOL => DataType::Bool,
        Type::INT2 | Type::INT4 | Type::INT8 => DataType::Int,
        Type::FLOAT4 | Type::FLOAT8 | Type::NUMERIC | Type::MONEY => DataType::Float,
        Type::DATE => DataType::Date,
        Type::TIMESTAMP | Type::TIMESTAMPTZ => DataType::Timestamp,
        _ => DataType::Text,
    }
}

/// Converts a `row_to_json` value to the column's declared type
fn decode_value(raw: &serde_json::Value, data_type: DataType) -> Value {
    let value = Value::from_json(raw);
    if value.is_null() || value.data_type() == Some(data_type) {
        return value;
    }
    match cast_value(&value, data_type, CastPolicy::BestEffort) {
        Cast::Ok(cast) => cast,
        Cast::Failed => value,
    }
}

#[async_trait]
impl SourceReader for PostgreSQLSource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = $1 ORDER BY table_name",
                &[&self.client.schema()],
            )
            .await?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| SourceError::QueryFailed(e.to_string()).into())
            })
            .collect()
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourceBatch> {
        let since_column = request.since.as_ref().map(|f| f.column.as_str());
        let inner = table_query(self.client.schema(), &request.table, since_column);

        let statement = self.client.prepare(&inner).await.map_err(|e| {
            if e.to_string().contains("does not exist") {
                SourceError::TableNotFound(request.table.clone()).into()
            } else {
                e
            }
        })?;
        let columns: Vec<Column> = statement
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), data_type_for(c.type_())))
            .collect();

        let outer = format!("SELECT row_to_json(t) FROM ({}) t", inner);
        let extracted_at = Utc::now().naive_utc();
        let rows = match &request.since {
            Some(filter) => self.client.query(&outer, &[&filter.cutoff]).await?,
            None => self.client.query(&outer, &[]).await?,
        };

        let mut table = Table::new(columns.clone());
        for row in &rows {
            let doc: serde_json::Value = row
                .try_get(0)
                .map_err(|e| SourceError::QueryFailed(format!("{}: {}", request.table, e)))?;
            let values = columns
                .iter()
                .map(|c| decode_value(doc.get(&c.name).unwrap_or(&serde_json::Value::Null), c.data_type))
                .collect();
            table.push_row(values)?;
        }

        tracing::debug!(
            table = %request.table,
            rows = table.len(),
            filtered = request.since.is_some(),
            "Fetched table from PostgreSQL"
        );
        Ok(SourceBatch {
            table,
            extracted_at,
        })
    }

    fn describe(&self) -> String {
        format!("postgresql {}", self.client.connection_string_safe())
    }
}
