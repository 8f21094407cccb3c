//! Declarative staging models
//!
//! A [`StagingModel`] maps one or more raw source tables onto a typed,
//! canonically named relation. Evaluation:
//!
//! 1. resolve every declared column in each raw batch (exact name, then
//!    canonical-equivalent name); a missing column is a schema error
//! 2. cast each cell under the column's policy; key columns are strict and a
//!    null or uncastable key rejects the row
//! 3. apply the retention window, if any
//! 4. append `_source` and `_loaded_at`, then union the batches

use super::cast::{cast_value, Cast, CastPolicy};
use super::naming::canonical_column_name;
use crate::adapters::source::traits::{SourceBatch, SourceRequest};
use crate::domain::{Column, DataType, EntityName, Result, SemanticError, Table, Value};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Provenance column: raw table the row came from
pub const SOURCE_COLUMN: &str = "_source";

/// Load timestamp column: extraction time of the raw batch
pub const LOADED_AT_COLUMN: &str = "_loaded_at";

/// One staged column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Raw column name as published by the source
    pub source: String,
    /// Canonical output name
    pub name: String,
    pub data_type: DataType,
    pub policy: CastPolicy,
}

impl ColumnSpec {
    /// Identifier column: strict cast, rows with a null or invalid value are rejected
    pub fn key(source: &str, data_type: DataType) -> Self {
        Self {
            source: source.to_string(),
            name: canonical_column_name(source),
            data_type,
            policy: CastPolicy::Strict,
        }
    }

    /// Descriptive column: best-effort cast, failures become null
    pub fn field(source: &str, data_type: DataType) -> Self {
        Self {
            source: source.to_string(),
            name: canonical_column_name(source),
            data_type,
            policy: CastPolicy::BestEffort,
        }
    }

    pub fn is_key(&self) -> bool {
        self.policy == CastPolicy::Strict
    }

    fn output_column(&self) -> Column {
        if self.is_key() {
            Column::required(self.name.clone(), self.data_type)
        } else {
            Column::new(self.name.clone(), self.data_type)
        }
    }
}

/// Hard filter on a timestamp column: rows older than `days` before the run
/// date are dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retention {
    /// Canonical column name
    pub column: String,
    pub days: u32,
}

impl Retention {
    /// First instant kept: midnight `days` before `as_of`
    pub fn cutoff(&self, as_of: NaiveDate) -> NaiveDateTime {
        as_of
            .checked_sub_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(NaiveDate::MIN)
            .and_time(NaiveTime::MIN)
    }
}

/// Row accounting for one staging evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingStats {
    pub input_rows: usize,
    /// Rows dropped for a null or uncastable key
    pub rejected_rows: usize,
    /// Non-key cells that degraded to null
    pub cast_failures: usize,
    /// Rows outside the retention window
    pub retention_dropped: usize,
}

impl StagingStats {
    fn merge(&mut self, other: &StagingStats) {
        self.input_rows += other.input_rows;
        self.rejected_rows += other.rejected_rows;
        self.cast_failures += other.cast_failures;
        self.retention_dropped += other.retention_dropped;
    }
}

#[derive(Debug, Clone)]
pub struct StagingModel {
    pub entity: EntityName,
    /// Raw tables unioned into this entity, in order
    pub sources: Vec<String>,
    pub columns: Vec<ColumnSpec>,
    pub retention: Option<Retention>,
}

impl StagingModel {
    pub fn new(entity: EntityName, sources: Vec<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            entity,
            sources,
            columns,
            retention: None,
        }
    }

    pub fn with_retention(mut self, column: &str, days: u32) -> Self {
        self.retention = Some(Retention {
            column: column.to_string(),
            days,
        });
        self
    }

    /// Output schema: declared columns plus provenance and load timestamp
    pub fn output_columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = self.columns.iter().map(ColumnSpec::output_column).collect();
        columns.push(Column::required(SOURCE_COLUMN, DataType::Text));
        columns.push(Column::new(LOADED_AT_COLUMN, DataType::Timestamp));
        columns
    }

    /// Fetch requests for every source, with the retention window pushed down
    pub fn requests(&self, as_of: NaiveDate) -> Vec<SourceRequest> {
        let pushdown = self.retention.as_ref().and_then(|r| {
            self.columns
                .iter()
                .find(|c| c.name == r.column)
                .map(|c| (c.source.clone(), r.cutoff(as_of)))
        });
        self.sources
            .iter()
            .map(|table| {
                let request = SourceRequest::table(table.clone());
                match &pushdown {
                    Some((column, cutoff)) => request.since(column.clone(), *cutoff),
                    None => request,
                }
            })
            .collect()
    }

    /// Stages fetched batches, given in the same order as [`requests`](Self::requests)
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError::Schema`] if a declared column is absent from
    /// any batch.
    pub fn transform(
        &self,
        batches: &[(String, SourceBatch)],
        as_of: NaiveDate,
    ) -> Result<(Table, StagingStats)> {
        let mut output = Table::new(self.output_columns());
        let mut stats = StagingStats::default();

        for (source_table, batch) in batches {
            let (rows, batch_stats) = self.stage_batch(source_table, batch, as_of)?;
            for row in rows {
                output.push_row(row)?;
            }
            stats.merge(&batch_stats);
        }

        if stats.rejected_rows > 0 {
            crate::log_rows_rejected!(
                &self.entity,
                stats.rejected_rows,
                "null or invalid identifier"
            );
        }
        if stats.cast_failures > 0 {
            tracing::debug!(
                entity = %self.entity,
                cast_failures = stats.cast_failures,
                "Non-key values degraded to null"
            );
        }
        Ok((output, stats))
    }

    /// Index of each declared column in the raw batch
    fn resolve_columns(&self, raw: &Table) -> Result<Vec<usize>> {
        let raw_names = raw.column_names();
        self.columns
            .iter()
            .map(|column| {
                raw_names
                    .iter()
                    .position(|n| *n == column.source)
                    .or_else(|| {
                        raw_names
                            .iter()
                            .position(|n| canonical_column_name(n) == column.name)
                    })
                    .ok_or_else(|| SemanticError::schema(self.entity.to_string(), column.source.clone()))
            })
            .collect()
    }

    fn stage_batch(
        &self,
        source_table: &str,
        batch: &SourceBatch,
        as_of: NaiveDate,
    ) -> Result<(Vec<Vec<Value>>, StagingStats)> {
        let indices = self.resolve_columns(&batch.table)?;
        let retention = self.retention.as_ref().map(|r| {
            let position = self.columns.iter().position(|c| c.name == r.column);
            (position, r.cutoff(as_of))
        });

        let mut stats = StagingStats {
            input_rows: batch.table.len(),
            ..Default::default()
        };
        let mut rows = Vec::with_capacity(batch.table.len());

        'rows: for raw in batch.table.raw_rows() {
            let mut row = Vec::with_capacity(self.columns.len() + 2);
            let mut failures = 0;
            for (column, &idx) in self.columns.iter().zip(&indices) {
                let cell = match cast_value(&raw[idx], column.data_type, column.policy) {
                    Cast::Ok(v) => v,
                    Cast::Failed if column.is_key() => {
                        stats.rejected_rows += 1;
                        continue 'rows;
                    }
                    Cast::Failed => {
                        failures += 1;
                        Value::Null
                    }
                };
                if column.is_key() && cell.is_null() {
                    stats.rejected_rows += 1;
                    continue 'rows;
                }
                row.push(cell);
            }

            if let Some((position, cutoff)) = &retention {
                let keep = position
                    .and_then(|p| row[p].as_timestamp())
                    .is_some_and(|ts| ts >= *cutoff);
                if !keep {
                    stats.retention_dropped += 1;
                    continue;
                }
            }

            stats.cast_failures += failures;
            row.push(Value::text(source_table));
            row.push(Value::Timestamp(batch.extracted_at));
            rows.push(row);
        }

        Ok((rows, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn batch(columns: &[&str], rows: Vec<Vec<Value>>) -> SourceBatch {
        SourceBatch {
            table: Table::from_rows(
                columns.iter().map(|c| Column::new(*c, DataType::Text)).collect(),
                rows,
            )
            .unwrap(),
            extracted_at: at(2024, 6, 30),
        }
    }

    fn model() -> StagingModel {
        StagingModel::new(
            "staging.stg_payroll".parse().unwrap(),
            vec!["CRMC_PayrollFile".to_string()],
            vec![
                ColumnSpec::key("EmpID", DataType::Int),
                ColumnSpec::field("Gross Pay", DataType::Float),
            ],
        )
    }

    #[test]
    fn test_key_failures_reject_rows_and_fields_degrade() {
        let raw = batch(
            &["EmpID", "Gross Pay"],
            vec![
                vec!["100".into(), "$1,200.50".into()],
                vec!["".into(), "900".into()],
                vec!["abc".into(), "900".into()],
                vec!["101".into(), "n/a".into()],
            ],
        );
        let (table, stats) = model()
            .transform(&[("CRMC_PayrollFile".to_string(), raw)], at(2024, 6, 30).date())
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(stats.rejected_rows, 2);
        assert_eq!(stats.cast_failures, 1);
        assert_eq!(
            table.column_names(),
            vec!["emp_id", "gross_pay", SOURCE_COLUMN, LOADED_AT_COLUMN]
        );
        assert!(table.rows().all(|r| !r.get("emp_id").is_null()));
        assert_eq!(table.raw_rows()[0][1], Value::Float(1200.5));
        assert!(table.raw_rows()[1][1].is_null());
    }

    #[test]
    fn test_canonical_equivalent_raw_names_resolve() {
        let raw = batch(&["emp_id", "GROSS_PAY"], vec![vec!["7".into(), "10".into()]]);
        let (table, _) = model()
            .transform(&[("CRMC_PayrollFile".to_string(), raw)], at(2024, 6, 30).date())
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let raw = batch(&["EmpID"], vec![vec!["7".into()]]);
        let err = model()
            .transform(&[("CRMC_PayrollFile".to_string(), raw)], at(2024, 6, 30).date())
            .unwrap_err();
        match err {
            SemanticError::Schema { entity, column } => {
                assert_eq!(entity, "staging.stg_payroll");
                assert_eq!(column, "Gross Pay");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_retention_is_a_hard_filter() {
        let model = StagingModel::new(
            "staging.stg_activity_log".parse().unwrap(),
            vec!["Activity_Log".to_string()],
            vec![
                ColumnSpec::key("ID", DataType::Int),
                ColumnSpec::field("EnteredDate", DataType::Timestamp),
            ],
        )
        .with_retention("entered_date", 30);

        let raw = batch(
            &["ID", "EnteredDate"],
            vec![
                vec!["1".into(), "2024-06-29 10:00:00".into()],
                vec!["2".into(), "2024-05-31 00:00:00".into()],
                vec!["3".into(), "2024-05-30 23:59:59".into()],
                vec!["4".into(), Value::Null],
            ],
        );
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let (table, stats) = model
            .transform(&[("Activity_Log".to_string(), raw)], as_of)
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(stats.retention_dropped, 2);

        let requests = model.requests(as_of);
        let since = requests[0].since.as_ref().unwrap();
        assert_eq!(since.column, "EnteredDate");
        assert_eq!(since.cutoff, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap().and_time(NaiveTime::MIN));
    }

    #[test]
    fn test_union_tags_provenance() {
        let model = StagingModel::new(
            "staging.stg_attendance".parse().unwrap(),
            vec!["Attendance_2024H1".to_string(), "Attendance_2024H2".to_string()],
            vec![
                ColumnSpec::key("EmpID", DataType::Int),
                ColumnSpec::field("Shift", DataType::Text),
            ],
        );
        let h1 = batch(&["EmpID", "Shift"], vec![vec!["100".into(), "Day".into()]]);
        let h2 = batch(&["EmpID", "Shift"], vec![vec!["100".into(), "Night".into()]]);
        let (table, _) = model
            .transform(
                &[
                    ("Attendance_2024H1".to_string(), h1),
                    ("Attendance_2024H2".to_string(), h2),
                ],
                at(2024, 6, 30).date(),
            )
            .unwrap();

        let sources: Vec<_> = table.rows().map(|r| r.str(SOURCE_COLUMN).unwrap().to_string()).collect();
        assert_eq!(sources, vec!["Attendance_2024H1", "Attendance_2024H2"]);
    }
}
