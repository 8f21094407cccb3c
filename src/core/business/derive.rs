//! Guarded numeric derivations and the direct-report index
//!
//! None of these functions fail: a missing or zero denominator yields the
//! documented fallback instead.

use crate::core::relation::{round_to, safe_ratio};
use crate::domain::{Result, Table, Value};
use std::collections::BTreeMap;

/// `First Last`, or whichever part is present
pub fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Annual salary if known, else hourly rate times the standard annual hours,
/// else 0
pub fn estimated_annual_salary(
    annual_salary: Option<f64>,
    hourly_rate: Option<f64>,
    annual_hours: f64,
) -> f64 {
    match (annual_salary, hourly_rate) {
        (Some(salary), _) if salary > 0.0 => round_to(salary, 2),
        (_, Some(rate)) if rate > 0.0 => round_to(rate * annual_hours, 2),
        _ => 0.0,
    }
}

/// Gross pay over hours worked; falls back to the base rate, then 0
pub fn effective_hourly_rate(
    gross_pay: Option<f64>,
    total_hours: Option<f64>,
    base_rate: Option<f64>,
) -> f64 {
    match (gross_pay, total_hours) {
        (Some(gross), Some(hours)) if hours > 0.0 => round_to(safe_ratio(gross, Some(hours)), 2),
        _ => base_rate.map_or(0.0, |r| round_to(r, 2)),
    }
}

/// Paid rate above the employee's base rate, 0 when either is unknown
pub fn rate_premium(rate: Option<f64>, base_rate: Option<f64>) -> f64 {
    match (rate, base_rate) {
        (Some(rate), Some(base)) => round_to(rate - base, 2),
        _ => 0.0,
    }
}

/// Number of direct reports per manager id
///
/// Only one level is counted; self-references are ignored, so reporting
/// cycles cannot cause unbounded work.
pub fn direct_report_counts(
    employees: &Table,
    id_column: &str,
    manager_column: &str,
) -> Result<BTreeMap<Value, i64>> {
    let id_idx = employees.column_index(id_column)?;
    let manager_idx = employees.column_index(manager_column)?;

    let mut counts: BTreeMap<Value, i64> = BTreeMap::new();
    for row in employees.raw_rows() {
        let (id, manager) = (&row[id_idx], &row[manager_idx]);
        if manager.is_null() || manager == id {
            continue;
        }
        *counts.entry(manager.clone()).or_default() += 1;
    }
    Ok(counts)
}
