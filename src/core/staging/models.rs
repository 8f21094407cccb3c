//! Staging models for the HR source tables

use super::model::{ColumnSpec, StagingModel};
use crate::config::schema::{PipelineConfig, SourceTablesConfig};
use crate::domain::{DataType, EntityName, Namespace, Result, SemanticError};

pub const STG_EMPLOYEES: &str = "stg_employees";
pub const STG_PAYROLL: &str = "stg_payroll";
pub const STG_ATTENDANCE: &str = "stg_attendance";
pub const STG_ACTIVITY_LOG: &str = "stg_activity_log";

fn staging_name(relation: &str) -> Result<EntityName> {
    EntityName::new(Namespace::Staging, relation).map_err(SemanticError::Catalog)
}

/// Workforce master, keyed by the internal surrogate `EmpID`
pub fn stg_employees(tables: &SourceTablesConfig) -> Result<StagingModel> {
    use DataType::*;
    Ok(StagingModel::new(
        staging_name(STG_EMPLOYEES)?,
        vec![tables.employees.clone()],
        vec![
            ColumnSpec::key("EmpID", Int),
            ColumnSpec::field("Employee Number", Text),
            ColumnSpec::field("First Name", Text),
            ColumnSpec::field("Last Name", Text),
            ColumnSpec::field("Department", Text),
            ColumnSpec::field("Job Title", Text),
            ColumnSpec::field("Employment Status", Text),
            ColumnSpec::field("Hire Date", Date),
            ColumnSpec::field("Termination Date", Date),
            ColumnSpec::field("Birth Date", Date),
            ColumnSpec::field("Reports To", Int),
            ColumnSpec::field("Pay Type", Text),
            ColumnSpec::field("Hourly Rate", Float),
            ColumnSpec::field("Annual Salary", Float),
            ColumnSpec::field("1099_Flag", Bool),
        ],
    ))
}

pub fn stg_payroll(tables: &SourceTablesConfig) -> Result<StagingModel> {
    use DataType::*;
    Ok(StagingModel::new(
        staging_name(STG_PAYROLL)?,
        vec![tables.payroll.clone()],
        vec![
            ColumnSpec::key("EmpID", Int),
            ColumnSpec::field("Pay Date", Date),
            ColumnSpec::field("Gross Pay", Float),
            ColumnSpec::field("Net Pay", Float),
            ColumnSpec::field("Regular Hours", Float),
            ColumnSpec::field("Overtime Hours", Float),
            ColumnSpec::field("Benefit Plan Type", Text),
            ColumnSpec::field("Benefit Plan Name", Text),
            ColumnSpec::field("Coverage Tier", Text),
            ColumnSpec::field("Current Arrears", Float),
            ColumnSpec::field("Total Arrears", Float),
            ColumnSpec::field("CorpID", Text),
        ],
    ))
}

/// Union of the time-boxed attendance batches
pub fn stg_attendance(tables: &SourceTablesConfig) -> Result<StagingModel> {
    use DataType::*;
    Ok(StagingModel::new(
        staging_name(STG_ATTENDANCE)?,
        tables.attendance.clone(),
        vec![
            ColumnSpec::key("EmpID", Int),
            ColumnSpec::field("Work Date", Date),
            ColumnSpec::field("Shift", Text),
            ColumnSpec::field("Clock In Timestamp", Timestamp),
            ColumnSpec::field("Hours", Float),
            ColumnSpec::field("Rate", Float),
            ColumnSpec::field("Earning Code", Text),
            ColumnSpec::field("Status", Text),
            ColumnSpec::field("Shift Diff Hours", Float),
        ],
    ))
}

/// Activity log restricted to the last `activity_log_days` before the run date
pub fn stg_activity_log(
    tables: &SourceTablesConfig,
    pipeline: &PipelineConfig,
) -> Result<StagingModel> {
    use DataType::*;
    Ok(StagingModel::new(
        staging_name(STG_ACTIVITY_LOG)?,
        vec![tables.activity_log.clone()],
        vec![
            ColumnSpec::key("ID", Int),
            ColumnSpec::field("EnteredDate", Timestamp),
            ColumnSpec::field("Module", Text),
            ColumnSpec::field("Activity Type", Text),
            ColumnSpec::field("UserName", Text),
            ColumnSpec::field("IP Address", Text),
        ],
    )
    .with_retention("entered_date", pipeline.activity_log_days))
}

pub fn staging_models(
    tables: &SourceTablesConfig,
    pipeline: &PipelineConfig,
) -> Result<Vec<StagingModel>> {
    Ok(vec![
        stg_employees(tables)?,
        stg_payroll(tables)?,
        stg_attendance(tables)?,
        stg_activity_log(tables, pipeline)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_output_names() {
        let model = stg_employees(&SourceTablesConfig::default()).unwrap();
        let names: Vec<_> = model.columns.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"emp_id"));
        assert!(names.contains(&"employee_number"));
        assert!(names.contains(&"reports_to"));
        assert!(names.contains(&"t_1099_flag"));
    }

    #[test]
    fn test_every_model_has_a_key_column() {
        let models =
            staging_models(&SourceTablesConfig::default(), &PipelineConfig::default()).unwrap();
        assert_eq!(models.len(), 4);
        for model in models {
            assert!(model.columns.iter().any(|c| c.is_key()), "{}", model.entity);
        }
    }

    #[test]
    fn test_activity_log_retention_uses_configured_days() {
        let pipeline = PipelineConfig {
            activity_log_days: 7,
            ..Default::default()
        };
        let model = stg_activity_log(&SourceTablesConfig::default(), &pipeline).unwrap();
        let retention = model.retention.unwrap();
        assert_eq!(retention.column, "entered_date");
        assert_eq!(retention.days, 7);
    }
}
