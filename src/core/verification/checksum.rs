//! Content checksums for relations
//!
//! Snapshots carry the SHA-256 of their table's canonical JSON so a reader
//! can detect a corrupted file and two rebuilds can be compared cheaply.

use crate::domain::{Result, Table};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Calculate SHA-256 checksum of JSON data
///
/// Object keys are sorted recursively before hashing, so key order and
/// whitespace do not affect the result.
///
/// # Examples
///
/// ```
/// use hrms_semantic::core::verification::checksum::calculate_checksum;
/// use serde_json::json;
///
/// let a = calculate_checksum(&json!({"b": 1, "a": 2})).unwrap();
/// let b = calculate_checksum(&json!({"a": 2, "b": 1})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn calculate_checksum(data: &Value) -> Result<String> {
    let normalized = normalize_json(data);
    let data_str = serde_json::to_string(&normalized)?;

    let mut hasher = Sha256::new();
    hasher.update(data_str.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Checksum of a table's schema and rows, in row order
pub fn table_checksum(table: &Table) -> Result<String> {
    calculate_checksum(&serde_json::to_value(table)?)
}

fn normalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), normalize_json(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(normalize_json).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, DataType, Value as Cell};
    use serde_json::json;

    fn table(hours: f64) -> Table {
        Table::from_rows(
            vec![
                Column::new("department", DataType::Text),
                Column::new("hours", DataType::Float),
            ],
            vec![vec!["ICU".into(), Cell::Float(hours)]],
        )
        .unwrap()
    }

    #[test]
    fn test_calculate_checksum_key_order_independence() {
        let a = calculate_checksum(&json!({"a": 1, "b": {"y": 2, "x": 3}})).unwrap();
        let b = calculate_checksum(&json!({"b": {"x": 3, "y": 2}, "a": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_table_checksum_is_deterministic() {
        assert_eq!(table_checksum(&table(8.0)).unwrap(), table_checksum(&table(8.0)).unwrap());
    }

    #[test]
    fn test_table_checksum_detects_changes() {
        assert_ne!(table_checksum(&table(8.0)).unwrap(), table_checksum(&table(8.5)).unwrap());
    }
}
