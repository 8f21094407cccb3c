//! Relational operations on [`Table`](crate::domain::Table)
//!
//! Projection, filtering, ordering and union live on the table type itself.
//! This module adds joins with fan-out statistics, group-by aggregation,
//! calendar bucketing and the guarded arithmetic used by every ratio metric.

pub mod aggregate;
pub mod bucket;
pub mod join;

pub use aggregate::{Agg, Aggregate};
pub use bucket::TimeGrain;
pub use join::{JoinKind, JoinStats};

/// Rounds to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `numerator / denominator`, or 0 when the denominator is zero, missing or
/// not finite
pub fn safe_ratio(numerator: f64, denominator: Option<f64>) -> f64 {
    match denominator {
        Some(d) if d != 0.0 && d.is_finite() && numerator.is_finite() => numerator / d,
        _ => 0.0,
    }
}

/// Percentage rounded to two decimals, 0 for a zero or missing denominator
pub fn safe_pct(numerator: f64, denominator: Option<f64>) -> f64 {
    round_to(safe_ratio(numerator, denominator) * 100.0, 2)
}
