//! Group-by aggregation
//!
//! Groups are emitted in key order, so output is deterministic for a given
//! input regardless of row arrival order.

use super::round_to;
use crate::domain::{Column, DataType, Result, Table, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Aggregate function over one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Agg {
    /// Number of rows
    Count,
    /// Number of distinct non-null values
    CountDistinct(String),
    /// Number of rows where the boolean column is true
    CountIf(String),
    Sum(String),
    /// Mean of non-null values; null for an all-null group
    Avg(String),
    Min(String),
    Max(String),
    /// Sample standard deviation; null below two values
    StdDev(String),
    /// Distinct non-null values, sorted and comma-joined
    StringAgg(String),
}

/// Named aggregate output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub output: String,
    pub agg: Agg,
}

impl Aggregate {
    pub fn new(output: impl Into<String>, agg: Agg) -> Self {
        Self {
            output: output.into(),
            agg,
        }
    }

    pub fn count(output: &str) -> Self {
        Self::new(output, Agg::Count)
    }

    pub fn count_distinct(output: &str, column: &str) -> Self {
        Self::new(output, Agg::CountDistinct(column.to_string()))
    }

    pub fn count_if(output: &str, column: &str) -> Self {
        Self::new(output, Agg::CountIf(column.to_string()))
    }

    pub fn sum(output: &str, column: &str) -> Self {
        Self::new(output, Agg::Sum(column.to_string()))
    }

    pub fn avg(output: &str, column: &str) -> Self {
        Self::new(output, Agg::Avg(column.to_string()))
    }

    pub fn min(output: &str, column: &str) -> Self {
        Self::new(output, Agg::Min(column.to_string()))
    }

    pub fn max(output: &str, column: &str) -> Self {
        Self::new(output, Agg::Max(column.to_string()))
    }

    pub fn std_dev(output: &str, column: &str) -> Self {
        Self::new(output, Agg::StdDev(column.to_string()))
    }

    pub fn string_agg(output: &str, column: &str) -> Self {
        Self::new(output, Agg::StringAgg(column.to_string()))
    }

    fn input(&self) -> Option<&str> {
        match &self.agg {
            Agg::Count => None,
            Agg::CountDistinct(c)
            | Agg::CountIf(c)
            | Agg::Sum(c)
            | Agg::Avg(c)
            | Agg::Min(c)
            | Agg::Max(c)
            | Agg::StdDev(c)
            | Agg::StringAgg(c) => Some(c),
        }
    }
}

impl Table {
    /// Groups rows by `keys` and evaluates `aggregates` per group
    ///
    /// With no keys the whole table forms one group, even when empty.
    pub fn group_by(&self, keys: &[&str], aggregates: &[Aggregate]) -> Result<Table> {
        let key_idx = keys
            .iter()
            .map(|k| self.column_index(k))
            .collect::<Result<Vec<_>>>()?;
        let agg_idx = aggregates
            .iter()
            .map(|a| a.input().map(|c| self.column_index(c)).transpose())
            .collect::<Result<Vec<_>>>()?;

        let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
        for (row_no, row) in self.raw_rows().iter().enumerate() {
            let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
            groups.entry(key).or_default().push(row_no);
        }
        if keys.is_empty() && groups.is_empty() {
            groups.insert(Vec::new(), Vec::new());
        }

        let mut columns: Vec<Column> = key_idx.iter().map(|&i| self.columns()[i].clone()).collect();
        for (aggregate, idx) in aggregates.iter().zip(&agg_idx) {
            let input_type = idx.map(|i| self.columns()[i].data_type);
            columns.push(Column::new(
                aggregate.output.clone(),
                output_type(&aggregate.agg, input_type),
            ));
        }

        let mut rows = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let mut row = key;
            for (aggregate, idx) in aggregates.iter().zip(&agg_idx) {
                let values: Vec<&Value> = match idx {
                    Some(i) => members.iter().map(|&r| &self.raw_rows()[r][*i]).collect(),
                    None => Vec::new(),
                };
                let input_type = idx.map(|i| self.columns()[i].data_type);
                row.push(evaluate(&aggregate.agg, members.len(), &values, input_type));
            }
            rows.push(row);
        }

        Table::from_rows(columns, rows)
    }
}

fn output_type(agg: &Agg, input: Option<DataType>) -> DataType {
    match agg {
        Agg::Count | Agg::CountDistinct(_) | Agg::CountIf(_) => DataType::Int,
        Agg::Sum(_) if input == Some(DataType::Int) => DataType::Int,
        Agg::Sum(_) | Agg::Avg(_) | Agg::StdDev(_) => DataType::Float,
        Agg::Min(_) | Agg::Max(_) => input.unwrap_or(DataType::Text),
        Agg::StringAgg(_) => DataType::Text,
    }
}

fn evaluate(agg: &Agg, group_len: usize, values: &[&Value], input: Option<DataType>) -> Value {
    let present = || values.iter().copied().filter(|v| !v.is_null());
    let numbers = || values.iter().filter_map(|v| v.as_f64());

    match agg {
        Agg::Count => Value::from(group_len),
        Agg::CountDistinct(_) => Value::from(present().collect::<BTreeSet<_>>().len()),
        Agg::CountIf(_) => Value::from(values.iter().filter(|v| v.as_bool() == Some(true)).count()),
        Agg::Sum(_) if input == Some(DataType::Int) => {
            Value::Int(values.iter().filter_map(|v| v.as_i64()).sum())
        }
        Agg::Sum(_) => Value::Float(round_to(numbers().sum(), 4)),
        Agg::Avg(_) => {
            let (sum, n) = numbers().fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
            if n == 0 {
                Value::Null
            } else {
                Value::Float(round_to(sum / n as f64, 4))
            }
        }
        Agg::Min(_) => present().min().cloned().unwrap_or_default(),
        Agg::Max(_) => present().max().cloned().unwrap_or_default(),
        Agg::StdDev(_) => {
            let xs: Vec<f64> = numbers().collect();
            if xs.len() < 2 {
                return Value::Null;
            }
            let mean = xs.iter().sum::<f64>() / xs.len() as f64;
            let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
            Value::Float(round_to(var.sqrt(), 4))
        }
        Agg::StringAgg(_) => {
            let distinct: BTreeSet<String> = present().map(|v| v.to_string()).collect();
            if distinct.is_empty() {
                Value::Null
            } else {
                Value::Text(distinct.into_iter().collect::<Vec<_>>().join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifts() -> Table {
        Table::from_rows(
            vec![
                Column::new("department", DataType::Text),
                Column::new("emp_id", DataType::Int),
                Column::new("hours", DataType::Float),
                Column::new("is_absent", DataType::Bool),
            ],
            vec![
                vec!["ICU".into(), 1i64.into(), 12.0.into(), false.into()],
                vec!["ICU".into(), 1i64.into(), 8.0.into(), false.into()],
                vec!["ICU".into(), 2i64.into(), Value::Null, true.into()],
                vec!["ER".into(), 3i64.into(), 10.0.into(), false.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_group_by_counts_and_sums() {
        let out = shifts()
            .group_by(
                &["department"],
                &[
                    Aggregate::count("shifts"),
                    Aggregate::count_distinct("staff", "emp_id"),
                    Aggregate::count_if("absences", "is_absent"),
                    Aggregate::sum("total_hours", "hours"),
                    Aggregate::avg("avg_hours", "hours"),
                ],
            )
            .unwrap();

        // ER sorts before ICU
        let rows = out.raw_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::text("ER"));
        assert_eq!(rows[1][1], Value::Int(3));
        assert_eq!(rows[1][2], Value::Int(2));
        assert_eq!(rows[1][3], Value::Int(1));
        assert_eq!(rows[1][4], Value::Float(20.0));
        assert_eq!(rows[1][5], Value::Float(10.0));
    }

    #[test]
    fn test_std_dev_and_min_max() {
        let out = shifts()
            .group_by(
                &[],
                &[
                    Aggregate::std_dev("sd", "hours"),
                    Aggregate::min("min_hours", "hours"),
                    Aggregate::max("max_hours", "hours"),
                ],
            )
            .unwrap();
        let row = &out.raw_rows()[0];
        assert_eq!(row[0], Value::Float(2.0));
        assert_eq!(row[1], Value::Float(8.0));
        assert_eq!(row[2], Value::Float(12.0));
    }

    #[test]
    fn test_empty_table_without_keys_yields_one_row() {
        let empty = shifts().filter(|_| false);
        let out = empty
            .group_by(&[], &[Aggregate::count("n"), Aggregate::avg("a", "hours")])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.raw_rows()[0][0], Value::Int(0));
        assert_eq!(out.raw_rows()[0][1], Value::Null);
    }

    #[test]
    fn test_string_agg_is_sorted_and_distinct() {
        let out = shifts()
            .group_by(&[], &[Aggregate::string_agg("departments", "department")])
            .unwrap();
        assert_eq!(out.raw_rows()[0][0], Value::text("ER, ICU"));
    }
}
