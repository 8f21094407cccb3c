//! In-memory relation type
//!
//! A [`Table`] is an ordered column schema plus rows. It is the single relation
//! representation used for raw extracts, every pipeline layer and snapshots.
//! Join and aggregation live in `core::relation`.

use super::errors::SemanticError;
use super::result::Result;
use super::value::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Nullable column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Non-nullable column
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }
}

/// Ordered relation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of a single row with by-name access
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [Column],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Value of the named column, `Null` when the column does not exist
    pub fn get(&self, column: &str) -> &'a Value {
        static NULL: Value = Value::Null;
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|i| &self.values[i])
            .unwrap_or(&NULL)
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }

    pub fn str(&self, column: &str) -> Option<&'a str> {
        self.get(column).as_str()
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// Sort direction for [`Table::order_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort key: column plus direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }
}

impl Table {
    /// Creates an empty table with the given schema
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a table from a schema and rows, validating row width
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Builds a table from untyped JSON records
    ///
    /// Columns appear in first-seen order. A column's type is the type of its
    /// first non-null value, falling back to text.
    pub fn from_json_records(records: &[serde_json::Map<String, serde_json::Value>]) -> Self {
        let mut names: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let rows: Vec<Vec<Value>> = records
            .iter()
            .map(|record| {
                names
                    .iter()
                    .map(|name| record.get(name).map(Value::from_json).unwrap_or_default())
                    .collect()
            })
            .collect();

        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let data_type = rows
                    .iter()
                    .find_map(|row| row[i].data_type())
                    .unwrap_or(DataType::Text);
                Column::new(name.clone(), data_type)
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Position of the named column
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SemanticError::Validation(format!("column '{}' does not exist", name)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row; its width must match the schema
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(SemanticError::Validation(format!(
                "row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Iterates over rows
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// All values of one column
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Projection onto the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>>>()?;
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Table { columns, rows })
    }

    /// Renames a column in place
    pub fn rename(mut self, from: &str, to: &str) -> Result<Table> {
        let idx = self.column_index(from)?;
        if from != to && self.has_column(to) {
            return Err(SemanticError::Validation(format!(
                "cannot rename '{}' to '{}': column already exists",
                from, to
            )));
        }
        self.columns[idx].name = to.to_string();
        Ok(self)
    }

    /// Keeps the rows for which the predicate holds
    pub fn filter<F>(&self, predicate: F) -> Table
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| predicate(row))
            .map(|row| row.values.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Appends a derived column computed per row
    pub fn with_column<F>(mut self, name: &str, data_type: DataType, f: F) -> Result<Table>
    where
        F: Fn(&Row<'_>) -> Value,
    {
        if self.has_column(name) {
            return Err(SemanticError::Validation(format!(
                "column '{}' already exists",
                name
            )));
        }
        let derived: Vec<Value> = self.rows().map(|row| f(&row)).collect();
        self.columns.push(Column::new(name, data_type));
        for (row, value) in self.rows.iter_mut().zip(derived) {
            row.push(value);
        }
        Ok(self)
    }

    /// Rewrites every value of one column; the column type is unchanged
    pub fn map_column<F>(mut self, name: &str, f: F) -> Result<Table>
    where
        F: Fn(&Value) -> Value,
    {
        let idx = self.column_index(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(self)
    }

    /// Replaces nulls in the named columns with `default`
    pub fn fill_null(mut self, names: &[&str], default: &Value) -> Result<Table> {
        for name in names {
            self = self.map_column(name, |v| if v.is_null() { default.clone() } else { v.clone() })?;
        }
        Ok(self)
    }

    /// Stable multi-key sort
    pub fn order_by(mut self, keys: &[SortKey]) -> Result<Table> {
        let resolved = keys
            .iter()
            .map(|k| Ok((self.column_index(&k.column)?, k.order)))
            .collect::<Result<Vec<_>>>()?;
        self.rows.sort_by(|a, b| {
            for (idx, order) in &resolved {
                let ord = a[*idx].cmp(&b[*idx]);
                let ord = match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(self)
    }

    /// Keeps at most `n` rows
    pub fn limit(mut self, n: usize) -> Table {
        self.rows.truncate(n);
        self
    }

    /// Appends the rows of a schema-identical table
    pub fn union(mut self, other: Table) -> Result<Table> {
        let same_shape = self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.data_type == b.data_type);
        if !same_shape {
            return Err(SemanticError::Validation(format!(
                "cannot union relations with different schemas: [{}] vs [{}]",
                self.column_names().join(", "),
                other.column_names().join(", ")
            )));
        }
        self.rows.extend(other.rows);
        Ok(self)
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.values)
                    .map(|(c, v)| (c.name.clone(), v.to_json()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec![
                Column::required("emp_id", DataType::Text),
                Column::new("department", DataType::Text),
                Column::new("hours", DataType::Float),
            ],
            vec![
                vec!["100".into(), "ICU".into(), 8.0.into()],
                vec!["101".into(), "ER".into(), 12.0.into()],
                vec!["102".into(), "ICU".into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = sample();
        let result = table.push_row(vec![Value::Null]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_and_filter() {
        let table = sample();
        let icu = table.filter(|r| r.str("department") == Some("ICU"));
        assert_eq!(icu.len(), 2);

        let ids = icu.select(&["emp_id"]).unwrap();
        assert_eq!(ids.column_names(), vec!["emp_id"]);
        assert!(table.select(&["missing"]).is_err());
    }

    #[test]
    fn test_order_by_desc_places_null_last() {
        let table = sample().order_by(&[SortKey::desc("hours")]).unwrap();
        let hours: Vec<_> = table.column_values("hours").unwrap();
        assert_eq!(hours[0], &Value::Float(12.0));
        assert_eq!(hours[2], &Value::Null);
    }

    #[test]
    fn test_with_column() {
        let table = sample()
            .with_column("is_icu", DataType::Bool, |r| {
                Value::Bool(r.str("department") == Some("ICU"))
            })
            .unwrap();
        assert_eq!(table.columns().len(), 4);
        assert!(table.clone().with_column("is_icu", DataType::Bool, |_| Value::Null).is_err());
    }

    #[test]
    fn test_fill_null() {
        let table = sample().fill_null(&["hours"], &Value::Float(0.0)).unwrap();
        assert_eq!(table.raw_rows()[2][2], Value::Float(0.0));
        assert!(sample().fill_null(&["missing"], &Value::Null).is_err());
    }

    #[test]
    fn test_union_requires_same_schema() {
        let a = sample();
        let b = sample();
        assert_eq!(a.clone().union(b).unwrap().len(), 6);

        let narrow = sample().select(&["emp_id"]).unwrap();
        assert!(a.union(narrow).is_err());
    }

    #[test]
    fn test_from_json_records_infers_types() {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(
            r#"[{"EmpID": 1, "Name": "Ann"}, {"EmpID": 2, "Name": null, "Extra": true}]"#,
        )
        .unwrap();
        let table = Table::from_json_records(&records);
        assert_eq!(table.column_names(), vec!["EmpID", "Name", "Extra"]);
        assert_eq!(table.columns()[0].data_type, DataType::Int);
        assert_eq!(table.columns()[2].data_type, DataType::Bool);
        assert_eq!(table.len(), 2);
    }
}
