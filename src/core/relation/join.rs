//! Key joins with fan-out accounting

use crate::domain::{Column, Result, SemanticError, Table, Value};
use std::collections::BTreeMap;

/// Join flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only left rows with at least one match
    Inner,
    /// Every left row; unmatched rows get nulls on the right side
    Left,
}

/// Row accounting for a single join
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub left_rows: usize,
    pub right_rows: usize,
    pub output_rows: usize,
    /// Left rows without a matching right row
    pub unmatched_left: usize,
    /// Extra rows produced because a left key matched several right rows
    pub fan_out_rows: usize,
}

impl JoinStats {
    pub fn has_fan_out(&self) -> bool {
        self.fan_out_rows > 0
    }
}

impl Table {
    /// Joins `right` onto this table on `left_key = right_key`
    ///
    /// Right-hand columns other than the key are appended in order. Null keys
    /// never match. A non-unique right key multiplies the matching left rows;
    /// the surplus is reported in [`JoinStats::fan_out_rows`].
    pub fn join(
        &self,
        right: &Table,
        left_key: &str,
        right_key: &str,
        kind: JoinKind,
    ) -> Result<(Table, JoinStats)> {
        let left_idx = self.column_index(left_key)?;
        let right_idx = right.column_index(right_key)?;

        let carried: Vec<usize> = (0..right.columns().len())
            .filter(|&i| i != right_idx)
            .collect();

        let mut columns: Vec<Column> = self.columns().to_vec();
        for &i in &carried {
            let mut column = right.columns()[i].clone();
            if self.has_column(&column.name) {
                return Err(SemanticError::Validation(format!(
                    "join would duplicate column '{}'",
                    column.name
                )));
            }
            if kind == JoinKind::Left {
                column.nullable = true;
            }
            columns.push(column);
        }

        let mut index: BTreeMap<&Value, Vec<usize>> = BTreeMap::new();
        for (row_no, row) in right.raw_rows().iter().enumerate() {
            let key = &row[right_idx];
            if !key.is_null() {
                index.entry(key).or_default().push(row_no);
            }
        }

        let mut stats = JoinStats {
            left_rows: self.len(),
            right_rows: right.len(),
            ..Default::default()
        };
        let mut rows = Vec::with_capacity(self.len());

        for left in self.raw_rows() {
            let matches = match &left[left_idx] {
                Value::Null => None,
                key => index.get(key),
            };
            match matches {
                Some(hits) => {
                    stats.fan_out_rows += hits.len() - 1;
                    for &hit in hits {
                        let mut row = left.clone();
                        let right_row = &right.raw_rows()[hit];
                        row.extend(carried.iter().map(|&i| right_row[i].clone()));
                        rows.push(row);
                    }
                }
                None => {
                    stats.unmatched_left += 1;
                    if kind == JoinKind::Left {
                        let mut row = left.clone();
                        row.extend(carried.iter().map(|_| Value::Null));
                        rows.push(row);
                    }
                }
            }
        }

        stats.output_rows = rows.len();
        let table = Table::from_rows(columns, rows)?;
        Ok((table, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataType;

    fn employees() -> Table {
        Table::from_rows(
            vec![
                Column::required("emp_id", DataType::Int),
                Column::new("full_name", DataType::Text),
            ],
            vec![
                vec![1i64.into(), "Ann Lee".into()],
                vec![2i64.into(), "Bo Chen".into()],
                vec![Value::Null, "Ghost".into()],
            ],
        )
        .unwrap()
    }

    fn payroll() -> Table {
        Table::from_rows(
            vec![
                Column::required("payee", DataType::Int),
                Column::new("gross_pay", DataType::Float),
            ],
            vec![
                vec![1i64.into(), 1000.0.into()],
                vec![1i64.into(), 1100.0.into()],
                vec![3i64.into(), 900.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let (joined, stats) = employees()
            .join(&payroll(), "emp_id", "payee", JoinKind::Left)
            .unwrap();
        assert_eq!(joined.column_names(), vec!["emp_id", "full_name", "gross_pay"]);
        assert_eq!(joined.len(), 4);
        assert_eq!(stats.unmatched_left, 2);
        assert_eq!(stats.fan_out_rows, 1);
        assert!(stats.has_fan_out());
    }

    #[test]
    fn test_inner_join_drops_unmatched_and_null_keys() {
        let (joined, stats) = employees()
            .join(&payroll(), "emp_id", "payee", JoinKind::Inner)
            .unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(stats.output_rows, 2);
    }

    #[test]
    fn test_duplicate_column_is_rejected() {
        let other = employees().rename("emp_id", "id").unwrap();
        let result = employees().join(&other, "emp_id", "id", JoinKind::Left);
        assert!(result.is_err());
    }
}
