//! Shared HR fixture for integration tests
//!
//! Run date 2024-06-30. Employee 100 works a Day shift in the first
//! attendance batch (plus 25 overtime hours) and a Night shift in the
//! second; employee 200 carries 600 in current arrears.

#![allow(dead_code)]

use chrono::NaiveDate;
use hrms_semantic::adapters::source::{MemorySource, SourceReader};
use hrms_semantic::config::SemanticConfig;
use hrms_semantic::core::cache::{CacheController, SnapshotStore};
use hrms_semantic::core::catalog::{standard_catalog, Evaluator};
use hrms_semantic::domain::{Column, DataType, Table, Value};
use std::sync::Arc;

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

pub fn date(month: u32, day: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(2024, month, day).unwrap())
}

fn text(s: &str) -> Value {
    Value::text(s)
}

pub fn config() -> SemanticConfig {
    let mut config = SemanticConfig::default();
    config.pipeline.as_of = Some(as_of());
    config.pipeline.min_staff_per_shift = 1;
    config
}

pub fn employees() -> Table {
    let columns = [
        ("EmpID", DataType::Int),
        ("Employee Number", DataType::Text),
        ("First Name", DataType::Text),
        ("Last Name", DataType::Text),
        ("Department", DataType::Text),
        ("Job Title", DataType::Text),
        ("Employment Status", DataType::Text),
        ("Hire Date", DataType::Date),
        ("Termination Date", DataType::Date),
        ("Birth Date", DataType::Date),
        ("Reports To", DataType::Int),
        ("Pay Type", DataType::Text),
        ("Hourly Rate", DataType::Float),
        ("Annual Salary", DataType::Float),
        ("1099_Flag", DataType::Bool),
    ];
    let employee = |id: i64, first: &str, last: &str, dept: &str, title: &str, manager: Value| {
        vec![
            Value::Int(id),
            text(&format!("E{}", id)),
            text(first),
            text(last),
            text(dept),
            text(title),
            text("Active"),
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap()),
            Value::Null,
            Value::Date(NaiveDate::from_ymd_opt(1990, 5, 1).unwrap()),
            manager,
            text("Hourly"),
            Value::Float(40.0),
            Value::Null,
            Value::Bool(false),
        ]
    };
    Table::from_rows(
        columns.iter().map(|(n, t)| Column::new(*n, *t)).collect(),
        vec![
            employee(100, "Ann", "Lee", "ICU", "Registered Nurse", Value::Int(300)),
            employee(200, "Bob", "Ray", "ICU", "Registered Nurse", Value::Int(300)),
            employee(300, "Cy", "Doe", "Administration", "Manager", Value::Null),
        ],
    )
    .unwrap()
}

pub fn payroll() -> Table {
    let columns = [
        ("EmpID", DataType::Int),
        ("Pay Date", DataType::Date),
        ("Gross Pay", DataType::Float),
        ("Net Pay", DataType::Float),
        ("Regular Hours", DataType::Float),
        ("Overtime Hours", DataType::Float),
        ("Benefit Plan Type", DataType::Text),
        ("Benefit Plan Name", DataType::Text),
        ("Coverage Tier", DataType::Text),
        ("Current Arrears", DataType::Float),
        ("Total Arrears", DataType::Float),
        ("CorpID", DataType::Text),
    ];
    let line = |id: i64, arrears: f64| {
        vec![
            Value::Int(id),
            date(6, 15),
            Value::Float(3200.0),
            Value::Float(2400.0),
            Value::Float(80.0),
            Value::Float(0.0),
            text("Medical"),
            text("PPO Gold"),
            text("Employee Only"),
            Value::Float(arrears),
            Value::Float(arrears),
            text("CRMC"),
        ]
    };
    Table::from_rows(
        columns.iter().map(|(n, t)| Column::new(*n, *t)).collect(),
        vec![line(100, 0.0), line(200, 600.0), line(300, 0.0)],
    )
    .unwrap()
}

fn attendance_columns() -> Vec<Column> {
    [
        ("EmpID", DataType::Int),
        ("Work Date", DataType::Date),
        ("Shift", DataType::Text),
        ("Clock In Timestamp", DataType::Timestamp),
        ("Hours", DataType::Float),
        ("Rate", DataType::Float),
        ("Earning Code", DataType::Text),
        ("Status", DataType::Text),
        ("Shift Diff Hours", DataType::Float),
    ]
    .iter()
    .map(|(n, t)| Column::new(*n, *t))
    .collect()
}

fn shift(id: i64, day: u32, label: &str, hours: f64, code: &str) -> Vec<Value> {
    vec![
        Value::Int(id),
        date(6, day),
        text(label),
        Value::Null,
        Value::Float(hours),
        Value::Float(40.0),
        text(code),
        text("Present"),
        Value::Float(0.0),
    ]
}

pub fn attendance_first_batch() -> Table {
    Table::from_rows(
        attendance_columns(),
        vec![
            shift(100, 10, "Day", 8.0, "REG"),
            shift(100, 11, "Day", 12.5, "OT"),
            shift(100, 12, "Day", 12.5, "OT"),
            shift(200, 10, "Day", 8.0, "REG"),
        ],
    )
    .unwrap()
}

pub fn attendance_second_batch() -> Table {
    Table::from_rows(attendance_columns(), vec![shift(100, 20, "Night", 8.0, "REG")]).unwrap()
}

pub fn activity_log() -> Table {
    let ts = |month: u32, day: u32| {
        Value::Timestamp(
            NaiveDate::from_ymd_opt(2024, month, day)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        )
    };
    Table::from_rows(
        vec![
            Column::new("ID", DataType::Int),
            Column::new("EnteredDate", DataType::Timestamp),
            Column::new("Module", DataType::Text),
            Column::new("Activity Type", DataType::Text),
            Column::new("UserName", DataType::Text),
            Column::new("IP Address", DataType::Text),
        ],
        vec![
            vec![Value::Int(1), ts(4, 1), text("Payroll"), text("Login"), text("admin"), text("10.0.0.1")],
            vec![Value::Int(2), ts(6, 25), text("Payroll"), text("Export"), text("admin"), text("10.0.0.1")],
        ],
    )
    .unwrap()
}

/// Every source table under the default configured names
pub fn source() -> MemorySource {
    let extracted = as_of().and_hms_opt(0, 0, 0).unwrap();
    MemorySource::new(extracted)
        .with_table("Employee_Master", employees())
        .with_table("CRMC_PayrollFile", payroll())
        .with_table("Attendance_2024H1", attendance_first_batch())
        .with_table("Attendance_2024H2", attendance_second_batch())
        .with_table("Activity_Log", activity_log())
}

/// Controller over the standard catalog reading `source` directly
pub fn controller(
    config: SemanticConfig,
    source: Arc<MemorySource>,
    store: Arc<dyn SnapshotStore>,
) -> Arc<CacheController> {
    let config = Arc::new(config);
    let catalog = Arc::new(standard_catalog(&config).unwrap());
    let reader: Arc<dyn SourceReader + Send + Sync> = source;
    let evaluator = Evaluator::new(catalog, reader, Arc::clone(&config), as_of());
    Arc::new(CacheController::new(evaluator, store))
}
