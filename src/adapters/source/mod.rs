//! Raw source readers
//!
//! - [`traits`] - the [`SourceReader`] contract
//! - [`memory`] - in-memory tables, used by tests
//! - [`factory`] - builds the remote and staging readers from configuration

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::{create_remote_source, create_staging_source};
pub use memory::MemorySource;
pub use traits::{SinceFilter, SourceBatch, SourceReader, SourceRequest};

use crate::core::staging::cast::{cast_value, Cast, CastPolicy};
use crate::domain::{DataType, Table, Value};

/// Keeps rows whose `filter.column` is at or after the cutoff
///
/// Used by readers that cannot push the predicate into a query. Values are
/// interpreted leniently; rows with an unreadable timestamp are dropped. A
/// missing column leaves the table untouched so the staging schema check can
/// report it.
pub(crate) fn apply_since(table: &Table, filter: &SinceFilter) -> Table {
    if !table.has_column(&filter.column) {
        return table.clone();
    }
    table.filter(|row| {
        match cast_value(row.get(&filter.column), DataType::Timestamp, CastPolicy::BestEffort) {
            Cast::Ok(Value::Timestamp(ts)) => ts >= filter.cutoff,
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;
    use chrono::NaiveDate;

    #[test]
    fn test_apply_since_filters_old_and_unreadable_rows() {
        let table = Table::from_rows(
            vec![Column::new("EnteredDate", DataType::Text)],
            vec![
                vec!["2024-06-01 08:00:00".into()],
                vec!["2024-04-01 08:00:00".into()],
                vec!["not a date".into()],
                vec![Value::Null],
            ],
        )
        .unwrap();
        let cutoff = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let filter = SinceFilter {
            column: "EnteredDate".to_string(),
            cutoff,
        };
        assert_eq!(apply_since(&table, &filter).len(), 1);
    }
}
