//! Type coercion with strict and best-effort policies
//!
//! Strict casts accept only canonical representations and are used for key
//! columns; a failure rejects the row. Best-effort casts additionally accept
//! common operational formats (currency, thousands separators, US dates,
//! Y/N flags) and degrade to null on failure.

use crate::domain::{DataType, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Cast policy for a staging column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastPolicy {
    Strict,
    BestEffort,
}

/// Result of casting a single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cast {
    /// Value converted (or blank input mapped to null)
    Ok(Value),
    /// Value could not be converted under the policy
    Failed,
}

const STRICT_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const LENIENT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y", "%m/%d/%y", "%d %b %Y", "%b %d, %Y",
    "%d.%m.%Y", "%Y%m%d",
];

const LENIENT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Casts `value` to `target` under `policy`
///
/// Null and blank text always cast to `Null`; whether that is acceptable is
/// decided by the caller (key columns reject null).
pub fn cast_value(value: &Value, target: DataType, policy: CastPolicy) -> Cast {
    if value.is_blank() {
        return Cast::Ok(Value::Null);
    }
    let converted = match policy {
        CastPolicy::Strict => strict(value, target),
        CastPolicy::BestEffort => strict(value, target).or_else(|| lenient(value, target)),
    };
    match converted {
        Some(v) => Cast::Ok(v),
        None => Cast::Failed,
    }
}

fn strict(value: &Value, target: DataType) -> Option<Value> {
    match (target, value) {
        (DataType::Text, Value::Text(s)) => Some(Value::Text(s.trim().to_string())),
        (DataType::Text, other) => Some(Value::Text(other.to_string())),

        (DataType::Int, Value::Int(i)) => Some(Value::Int(*i)),
        (DataType::Int, Value::Float(_)) => value.as_i64().map(Value::Int),
        (DataType::Int, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Int),

        (DataType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (DataType::Float, Value::Float(f)) if f.is_finite() => Some(Value::Float(*f)),
        (DataType::Float, Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float),

        (DataType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (DataType::Bool, Value::Text(s)) => match s.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (DataType::Date, Value::Date(d)) => Some(Value::Date(*d)),
        (DataType::Date, Value::Timestamp(ts)) => Some(Value::Date(ts.date())),
        (DataType::Date, Value::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .map(Value::Date),

        (DataType::Timestamp, Value::Timestamp(ts)) => Some(Value::Timestamp(*ts)),
        (DataType::Timestamp, Value::Date(d)) => d.and_hms_opt(0, 0, 0).map(Value::Timestamp),
        (DataType::Timestamp, Value::Text(s)) => {
            parse_timestamp(s.trim(), STRICT_TIMESTAMP_FORMATS).map(Value::Timestamp)
        }

        _ => None,
    }
}

fn lenient(value: &Value, target: DataType) -> Option<Value> {
    match (target, value) {
        (DataType::Int, Value::Text(s)) => {
            let n = parse_number(s)?;
            (n.fract() == 0.0).then_some(Value::Int(n as i64))
        }
        (DataType::Float, Value::Text(s)) => parse_number(s).map(Value::Float),

        (DataType::Bool, Value::Int(i)) => match i {
            0 => Some(Value::Bool(false)),
            1 => Some(Value::Bool(true)),
            _ => None,
        },
        (DataType::Bool, Value::Text(s)) => match s.trim().to_lowercase().as_str() {
            "y" | "yes" | "t" | "1" | "true" => Some(Value::Bool(true)),
            "n" | "no" | "f" | "0" | "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (DataType::Date, Value::Text(s)) => {
            let s = s.trim();
            parse_date(s)
                .or_else(|| parse_timestamp(s, LENIENT_TIMESTAMP_FORMATS).map(|ts| ts.date()))
                .map(Value::Date)
        }
        (DataType::Timestamp, Value::Text(s)) => {
            let s = s.trim();
            parse_timestamp(s, LENIENT_TIMESTAMP_FORMATS)
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
                .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
                .map(Value::Timestamp)
        }
        _ => None,
    }
}

/// Parses numbers written as `$1,234.50`, `12.5%`, `(40.00)` or ` 7 `
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | ' '))
        .collect();
    let n = cleaned.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Some(if negative { -n } else { n })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    LENIENT_DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn parse_timestamp(s: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}
