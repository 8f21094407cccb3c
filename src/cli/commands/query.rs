//! Query command implementation
//!
//! Reads an entity through the cache controller and prints it. Filters are
//! applied before ordering, projection last.

use super::{controller_or_report, load_or_report};
use crate::core::cache::ReadMode;
use crate::domain::{EntityName, Result, SemanticError, SortKey, Table};
use clap::{Args, ValueEnum};

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    /// JSON array of row objects
    Json,
}

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Entity to read (bare names resolve to `business.`)
    pub entity: String,

    /// Comma-separated columns to return
    #[arg(long)]
    pub select: Option<String>,

    /// Equality filter `column=value`; repeat to combine with AND
    #[arg(long)]
    pub filter: Vec<String>,

    /// Sort key `column` or `column:desc`; repeat for secondary keys
    #[arg(long)]
    pub order: Vec<String>,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<usize>,

    /// Bypass snapshots and evaluate the upstream chain live
    #[arg(long)]
    pub live: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl QueryArgs {
    /// Execute the query command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(entity = %self.entity, live = self.live, "Starting query command");

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

        let mode = if self.live {
            ReadMode::Bypass
        } else {
            ReadMode::Cached
        };
        let result = match controller.get(&entity, mode).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(entity = %entity, error = %e, "Query failed");
                eprintln!("❌ Query of {} failed", entity);
                eprintln!("   Error: {e}");
                return Ok(1);
            }
        };

        let table = match self.shape(&result.table) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        // Provenance goes to stderr so stdout stays machine-readable
        eprintln!("{}: {} rows, {}", result.entity, table.len(), result.freshness);
        if !result.diagnostics.is_clean() {
            eprintln!(
                "  rejected rows: {}, cast failures: {}, join fan-outs: {}",
                result.diagnostics.rejected_rows,
                result.diagnostics.cast_failures,
                result.diagnostics.fan_outs.len()
            );
        }

        match self.format {
            OutputFormat::Table => print!("{}", render_table(&table)),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&table.to_json_records())?)
            }
        }
        Ok(0)
    }

    /// Applies filter, order, limit and projection
    pub fn shape(&self, table: &Table) -> Result<Table> {
        let mut shaped = table.clone();

        for filter in &self.filter {
            let (column, expected) = filter.split_once('=').ok_or_else(|| {
                SemanticError::Validation(format!(
                    "Invalid filter '{}': expected column=value",
                    filter
                ))
            })?;
            let column = column.trim();
            shaped.column_index(column)?;
            let expected = expected.trim();
            shaped = shaped.filter(|row| row.get(column).to_string() == expected);
        }

        if !self.order.is_empty() {
            let keys: Vec<SortKey> = self
                .order
                .iter()
                .map(|key| match key.rsplit_once(':') {
                    Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => {
                        SortKey::desc(column.trim())
                    }
                    Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => {
                        SortKey::asc(column.trim())
                    }
                    _ => SortKey::asc(key.trim()),
                })
                .collect();
            shaped = shaped.order_by(&keys)?;
        }

        if let Some(limit) = self.limit {
            shaped = shaped.limit(limit);
        }

        if let Some(select) = &self.select {
            let columns: Vec<&str> = select
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();
            shaped = shaped.select(&columns)?;
        }

        Ok(shaped)
    }
}

/// Renders a table with left-aligned, width-fitted columns
fn render_table(table: &Table) -> String {
    let headers = table.column_names();
    let cells: Vec<Vec<String>> = table
        .raw_rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.clone()));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, DataType, Value};

    fn args() -> QueryArgs {
        QueryArgs {
            entity: "employee_summary".to_string(),
            select: None,
            filter: Vec::new(),
            order: Vec::new(),
            limit: None,
            live: false,
            format: OutputFormat::Table,
        }
    }

    fn staff() -> Table {
        Table::from_rows(
            vec![
                Column::new("emp_id", DataType::Int),
                Column::new("department", DataType::Text),
            ],
            vec![
                vec![Value::Int(1), "ICU".into()],
                vec![Value::Int(2), "Ward".into()],
                vec![Value::Int(3), "ICU".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_filters_orders_limits_and_projects() {
        let mut args = args();
        args.filter = vec!["department=ICU".to_string()];
        args.order = vec!["emp_id:desc".to_string()];
        args.limit = Some(1);
        args.select = Some("emp_id".to_string());

        let shaped = args.shape(&staff()).unwrap();
        assert_eq!(shaped.column_names(), vec!["emp_id"]);
        assert_eq!(shaped.raw_rows(), &[vec![Value::Int(3)]]);
    }

    #[test]
    fn test_shape_rejects_malformed_filter_and_unknown_column() {
        let mut args = args();
        args.filter = vec!["department".to_string()];
        assert!(args.shape(&staff()).is_err());

        args.filter = vec!["unit=ICU".to_string()];
        assert!(args.shape(&staff()).is_err());
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let rendered = render_table(&staff());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "emp_id  department");
        assert_eq!(lines[2], "1       ICU");
        assert_eq!(lines.len(), 5);
    }
}
