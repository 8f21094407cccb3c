//! Metrics layer
//!
//! Pre-aggregated summary facts over the business entities. Every ratio is
//! computed with [`safe_pct`](crate::core::relation::safe_pct), so an empty
//! denominator yields 0.

pub mod views;

pub use views::{
    definitions, ACTIVITY_SUMMARY, ATTENDANCE_METRICS, BENEFIT_ENROLLMENT_METRICS,
    CLINICAL_WORKFORCE_METRICS, DEPARTMENT_STAFFING_RATIOS, HEADCOUNT_METRICS,
    MONTHLY_PAYROLL_METRICS, SHIFT_COVERAGE_METRICS,
};
