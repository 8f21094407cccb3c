//! Business layer
//!
//! Joins staging entities into employee-centric views and applies the
//! rule-table classifications (clinical role, care unit, shift, bands,
//! burnout risk).

pub mod classify;
pub mod derive;
pub mod views;

pub use views::{
    definitions, ATTENDANCE_DETAIL, CLINICAL_STAFF_SUMMARY, EMPLOYEE_SUMMARY, PAYROLL_DETAIL,
};
