//! Metric entities
//!
//! Every metric is a group-by over a business (or staging) entity followed by
//! guarded ratio columns. Groups come out in key order.

use crate::core::business::{
    ATTENDANCE_DETAIL, CLINICAL_STAFF_SUMMARY, EMPLOYEE_SUMMARY, PAYROLL_DETAIL,
};
use crate::core::catalog::{BuildContext, EntityDefinition, Inputs};
use crate::core::relation::{round_to, safe_pct, Aggregate, TimeGrain};
use crate::core::staging::models::STG_ACTIVITY_LOG;
use crate::domain::{DataType, EntityName, Namespace, Result, Row, SemanticError, Table, Value};
use chrono::Datelike;

pub const HEADCOUNT_METRICS: &str = "headcount_metrics";
pub const BENEFIT_ENROLLMENT_METRICS: &str = "benefit_enrollment_metrics";
pub const MONTHLY_PAYROLL_METRICS: &str = "monthly_payroll_metrics";
pub const ATTENDANCE_METRICS: &str = "attendance_metrics";
pub const SHIFT_COVERAGE_METRICS: &str = "shift_coverage_metrics";
pub const DEPARTMENT_STAFFING_RATIOS: &str = "department_staffing_ratios";
pub const CLINICAL_WORKFORCE_METRICS: &str = "clinical_workforce_metrics";
pub const ACTIVITY_SUMMARY: &str = "activity_summary";

const NEW_HIRE_BAND: &str = "< 1 year";

pub fn definitions() -> Result<Vec<EntityDefinition>> {
    let name = |namespace: Namespace, relation: &str| {
        EntityName::new(namespace, relation).map_err(SemanticError::Catalog)
    };
    let business = |r: &str| name(Namespace::Business, r);
    let metrics = |r: &str| name(Namespace::Metrics, r);

    Ok(vec![
        EntityDefinition::derived(
            metrics(HEADCOUNT_METRICS)?,
            "Headcount, tenure and salary by department and employment status",
            vec![business(EMPLOYEE_SUMMARY)?],
            headcount_metrics,
        ),
        EntityDefinition::derived(
            metrics(BENEFIT_ENROLLMENT_METRICS)?,
            "Enrollment and arrears by benefit plan type",
            vec![business(PAYROLL_DETAIL)?],
            benefit_enrollment_metrics,
        ),
        EntityDefinition::derived(
            metrics(MONTHLY_PAYROLL_METRICS)?,
            "Pay, hours and overtime share by month and department",
            vec![business(PAYROLL_DETAIL)?],
            monthly_payroll_metrics,
        ),
        EntityDefinition::derived(
            metrics(ATTENDANCE_METRICS)?,
            "Attendance rate, hours and overtime by month and department",
            vec![business(ATTENDANCE_DETAIL)?],
            attendance_metrics,
        ),
        EntityDefinition::derived(
            metrics(SHIFT_COVERAGE_METRICS)?,
            "Staffing and hours by ISO week, shift type and day type",
            vec![business(ATTENDANCE_DETAIL)?],
            shift_coverage_metrics,
        ),
        EntityDefinition::derived(
            metrics(DEPARTMENT_STAFFING_RATIOS)?,
            "Daily clinical staffing mix and understaffed days by month, department and shift",
            vec![business(ATTENDANCE_DETAIL)?],
            department_staffing_ratios,
        ),
        EntityDefinition::derived(
            metrics(CLINICAL_WORKFORCE_METRICS)?,
            "Clinical workforce composition, attendance and burnout by care unit and role",
            vec![business(CLINICAL_STAFF_SUMMARY)?],
            clinical_workforce_metrics,
        ),
        EntityDefinition::derived(
            metrics(ACTIVITY_SUMMARY)?,
            "Application activity by day and module",
            vec![name(Namespace::Staging, STG_ACTIVITY_LOG)?],
            activity_summary,
        ),
    ])
}

/// Rounds float columns in place; nulls stay null
fn round_columns(table: Table, names: &[&str], places: i32) -> Result<Table> {
    names.iter().try_fold(table, |table, name| {
        table.map_column(name, |v| match v {
            Value::Float(x) => Value::Float(round_to(*x, places)),
            other => other.clone(),
        })
    })
}

/// `numerator / denominator` as a percentage, both read from the row
fn pct(row: &Row<'_>, numerator: &str, denominator: f64) -> Value {
    Value::Float(safe_pct(row.f64(numerator).unwrap_or(0.0), Some(denominator)))
}

fn is_present(r: &Row<'_>) -> bool {
    r.get("is_present").as_bool() == Some(true)
}

/// Present on the shift and holding `role`
fn present_role(role: &'static str) -> impl Fn(&Row<'_>) -> Value {
    move |r| (is_present(r) && r.str("clinical_role") == Some(role)).into()
}

fn headcount_metrics(inputs: &Inputs, _ctx: &mut BuildContext) -> Result<Table> {
    let summary = inputs
        .get(EMPLOYEE_SUMMARY)?
        .select(&[
            "department",
            "employment_status",
            "is_active",
            "is_contractor",
            "tenure_years",
            "tenure_band",
            "estimated_annual_salary",
        ])?
        .with_column("is_new_hire", DataType::Bool, |r| {
            (r.str("tenure_band") == Some(NEW_HIRE_BAND)).into()
        })?;

    let grouped = summary.group_by(
        &["department", "employment_status"],
        &[
            Aggregate::count("employee_count"),
            Aggregate::count_if("active_count", "is_active"),
            Aggregate::avg("avg_tenure_years", "tenure_years"),
            Aggregate::avg("avg_estimated_salary", "estimated_annual_salary"),
            Aggregate::sum("total_estimated_salary", "estimated_annual_salary"),
            Aggregate::count_if("contractor_count", "is_contractor"),
            Aggregate::count_if("new_hires_under_1_year", "is_new_hire"),
        ],
    )?;
    round_columns(
        grouped,
        &["avg_tenure_years", "avg_estimated_salary", "total_estimated_salary"],
        2,
    )
}

fn benefit_enrollment_metrics(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let as_of = ctx.as_of;
    let lines = inputs
        .get(PAYROLL_DETAIL)?
        .filter(|r| r.get("pay_date").as_date().map_or(true, |d| d <= as_of))
        .select(&["benefit_plan_type", "emp_id", "current_arrears"])?
        .fill_null(&["benefit_plan_type"], &Value::text("None"))?;

    let grouped = lines.group_by(
        &["benefit_plan_type"],
        &[
            Aggregate::count_distinct("employee_count", "emp_id"),
            Aggregate::count("enrollment_records"),
            Aggregate::avg("avg_current_arrears", "current_arrears"),
            Aggregate::sum("total_current_arrears", "current_arrears"),
        ],
    )?;
    round_columns(grouped, &["avg_current_arrears", "total_current_arrears"], 2)
}

fn monthly_payroll_metrics(inputs: &Inputs, _ctx: &mut BuildContext) -> Result<Table> {
    let grouped = inputs.get(PAYROLL_DETAIL)?.group_by(
        &["year_month", "department"],
        &[
            Aggregate::count_distinct("employee_count", "emp_id"),
            Aggregate::sum("total_gross_pay", "gross_pay"),
            Aggregate::sum("total_net_pay", "net_pay"),
            Aggregate::sum("total_regular_hours", "regular_hours"),
            Aggregate::sum("total_overtime_hours", "overtime_hours"),
            Aggregate::avg("avg_effective_hourly_rate", "effective_hourly_rate"),
        ],
    )?;

    let grouped = grouped.with_column("overtime_pct", DataType::Float, |r| {
        let total = r.f64("total_regular_hours").unwrap_or(0.0)
            + r.f64("total_overtime_hours").unwrap_or(0.0);
        pct(r, "total_overtime_hours", total)
    })?;
    round_columns(
        grouped,
        &[
            "total_gross_pay",
            "total_net_pay",
            "total_regular_hours",
            "total_overtime_hours",
            "avg_effective_hourly_rate",
        ],
        2,
    )
}

fn attendance_metrics(inputs: &Inputs, _ctx: &mut BuildContext) -> Result<Table> {
    let grouped = inputs.get(ATTENDANCE_DETAIL)?.group_by(
        &["year_month", "department"],
        &[
            Aggregate::count_distinct("employee_count", "emp_id"),
            Aggregate::count("total_records"),
            Aggregate::count_if("present_count", "is_present"),
            Aggregate::count_if("late_count", "is_late"),
            Aggregate::count_if("absent_count", "is_absent"),
            Aggregate::sum("total_hours", "hours"),
            Aggregate::avg("avg_hours", "hours"),
            Aggregate::std_dev("hours_stddev", "hours"),
            Aggregate::sum("total_overtime_hours", "overtime_hours"),
            Aggregate::sum("total_shift_diff_hours", "shift_diff_hours"),
        ],
    )?;

    let grouped = grouped
        .with_column("attendance_rate_pct", DataType::Float, |r| {
            let present = r.f64("present_count").unwrap_or(0.0);
            let absent = r.f64("absent_count").unwrap_or(0.0);
            pct(r, "present_count", present + absent)
        })?
        .with_column("overtime_pct", DataType::Float, |r| {
            pct(r, "total_overtime_hours", r.f64("total_hours").unwrap_or(0.0))
        })?;
    round_columns(
        grouped,
        &["total_hours", "avg_hours", "hours_stddev", "total_overtime_hours", "total_shift_diff_hours"],
        2,
    )
}

fn shift_coverage_metrics(inputs: &Inputs, _ctx: &mut BuildContext) -> Result<Table> {
    let grouped = inputs.get(ATTENDANCE_DETAIL)?.group_by(
        &["week_start", "shift_type", "day_type"],
        &[
            Aggregate::count_distinct("staff_count", "emp_id"),
            Aggregate::count("total_shifts"),
            Aggregate::sum("total_hours_worked", "hours"),
            Aggregate::avg("avg_hours_per_shift", "hours"),
            Aggregate::sum("total_overtime_hours", "overtime_hours"),
            Aggregate::count_if("extended_shifts_count", "is_extended_shift"),
            Aggregate::count_if("shifts_with_differential", "has_differential"),
        ],
    )?;

    let grouped = grouped
        .with_column("year_month", DataType::Text, |r| {
            r.get("week_start")
                .as_date()
                .map(|d| TimeGrain::Month.label(d))
                .into()
        })?
        .with_column("overtime_pct", DataType::Float, |r| {
            pct(r, "total_overtime_hours", r.f64("total_hours_worked").unwrap_or(0.0))
        })?
        .with_column("differential_pct", DataType::Float, |r| {
            pct(r, "shifts_with_differential", r.f64("total_shifts").unwrap_or(0.0))
        })?;

    round_columns(
        grouped,
        &["total_hours_worked", "avg_hours_per_shift", "total_overtime_hours"],
        2,
    )?
    .select(&[
        "week_start",
        "year_month",
        "shift_type",
        "day_type",
        "staff_count",
        "total_shifts",
        "total_hours_worked",
        "avg_hours_per_shift",
        "total_overtime_hours",
        "overtime_pct",
        "extended_shifts_count",
        "shifts_with_differential",
        "differential_pct",
    ])
}

fn department_staffing_ratios(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let min_staff = i64::from(ctx.config.pipeline.min_staff_per_shift);

    // Every scheduled row keeps its day in the grouping; only present staff
    // are counted, so a full call-out shows up as a zero-staff day
    let scheduled = inputs
        .get(ATTENDANCE_DETAIL)?
        .select(&[
            "work_date",
            "department",
            "shift_type",
            "emp_id",
            "clinical_role",
            "is_present",
        ])?
        .with_column("present_emp_id", DataType::Int, |r| {
            if is_present(r) {
                r.get("emp_id").clone()
            } else {
                Value::Null
            }
        })?
        .with_column("is_rn", DataType::Bool, present_role("RN"))?
        .with_column("is_lpn", DataType::Bool, present_role("LPN"))?
        .with_column("is_cna", DataType::Bool, present_role("CNA"))?;

    let daily = scheduled
        .group_by(
            &["work_date", "department", "shift_type"],
            &[
                Aggregate::count_if("rn_count", "is_rn"),
                Aggregate::count_if("lpn_count", "is_lpn"),
                Aggregate::count_if("cna_count", "is_cna"),
                Aggregate::count_distinct("total_staff_count", "present_emp_id"),
            ],
        )?
        .with_column("year", DataType::Int, |r| {
            r.get("work_date").as_date().map(|d| i64::from(d.year())).into()
        })?
        .with_column("month", DataType::Int, |r| {
            r.get("work_date").as_date().map(|d| i64::from(d.month())).into()
        })?
        .with_column("is_understaffed", DataType::Bool, |r| {
            (r.get("total_staff_count").as_i64().unwrap_or(0) < min_staff).into()
        })?;

    let grouped = daily.group_by(
        &["year", "month", "department", "shift_type"],
        &[
            Aggregate::count("days_observed"),
            Aggregate::avg("avg_rn_count", "rn_count"),
            Aggregate::avg("avg_lpn_count", "lpn_count"),
            Aggregate::avg("avg_cna_count", "cna_count"),
            Aggregate::avg("avg_total_staff_count", "total_staff_count"),
            Aggregate::min("min_total_staff_count", "total_staff_count"),
            Aggregate::max("max_total_staff_count", "total_staff_count"),
            Aggregate::count_if("understaffed_days", "is_understaffed"),
        ],
    )?;

    let grouped = grouped.with_column("understaffed_days_pct", DataType::Float, |r| {
        pct(r, "understaffed_days", r.f64("days_observed").unwrap_or(0.0))
    })?;
    round_columns(
        grouped,
        &["avg_rn_count", "avg_lpn_count", "avg_cna_count", "avg_total_staff_count"],
        2,
    )
}

fn clinical_workforce_metrics(inputs: &Inputs, _ctx: &mut BuildContext) -> Result<Table> {
    let staff = inputs
        .get(CLINICAL_STAFF_SUMMARY)?
        .select(&[
            "care_unit_type",
            "clinical_role",
            "employment_status",
            "is_active",
            "tenure_years",
            "tenure_band",
            "attendance_rate_pct",
            "overtime_percentage",
            "burnout_risk_level",
        ])?
        .with_column("is_high_burnout", DataType::Bool, |r| {
            (r.str("burnout_risk_level") == Some("High Risk")).into()
        })?
        .with_column("is_moderate_burnout", DataType::Bool, |r| {
            (r.str("burnout_risk_level") == Some("Moderate Risk")).into()
        })?
        .with_column("is_new_hire", DataType::Bool, |r| {
            (r.str("tenure_band") == Some(NEW_HIRE_BAND)).into()
        })?
        .with_column("is_experienced", DataType::Bool, |r| {
            r.f64("tenure_years").is_some_and(|t| t >= 5.0).into()
        })?;

    let grouped = staff.group_by(
        &["care_unit_type", "clinical_role", "employment_status"],
        &[
            Aggregate::count("staff_count"),
            Aggregate::count_if("active_count", "is_active"),
            Aggregate::avg("avg_tenure_years", "tenure_years"),
            Aggregate::avg("avg_attendance_rate", "attendance_rate_pct"),
            Aggregate::avg("avg_overtime_pct", "overtime_percentage"),
            Aggregate::count_if("high_burnout_count", "is_high_burnout"),
            Aggregate::count_if("moderate_burnout_count", "is_moderate_burnout"),
            Aggregate::count_if("new_hires_under_1_year", "is_new_hire"),
            Aggregate::count_if("experienced_staff_5plus_years", "is_experienced"),
        ],
    )?;
    round_columns(
        grouped,
        &["avg_tenure_years", "avg_attendance_rate", "avg_overtime_pct"],
        2,
    )
}

fn activity_summary(inputs: &Inputs, _ctx: &mut BuildContext) -> Result<Table> {
    inputs
        .get(STG_ACTIVITY_LOG)?
        .select(&["entered_date", "module", "activity_type", "user_name"])?
        .with_column("activity_date", DataType::Date, |r| {
            r.get("entered_date").as_timestamp().map(|ts| ts.date()).into()
        })?
        .group_by(
            &["activity_date", "module"],
            &[
                Aggregate::count("activity_count"),
                Aggregate::count_distinct("distinct_users", "user_name"),
                Aggregate::string_agg("activity_types", "activity_type"),
                Aggregate::min("first_activity", "entered_date"),
                Aggregate::max("last_activity", "entered_date"),
            ],
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemanticConfig;
    use crate::domain::Column;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn ctx() -> BuildContext {
        let mut config = SemanticConfig::default();
        config.pipeline.min_staff_per_shift = 2;
        BuildContext::new(
            "metrics.test".parse().unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            Arc::new(config),
        )
    }

    fn date(day: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(2024, 6, day).unwrap())
    }

    fn attendance_columns() -> Vec<Column> {
        vec![
            Column::new("emp_id", DataType::Int),
            Column::new("department", DataType::Text),
            Column::new("clinical_role", DataType::Text),
            Column::new("work_date", DataType::Date),
            Column::new("week_start", DataType::Date),
            Column::new("year_month", DataType::Text),
            Column::new("shift_type", DataType::Text),
            Column::new("day_type", DataType::Text),
            Column::new("hours", DataType::Float),
            Column::new("overtime_hours", DataType::Float),
            Column::new("shift_diff_hours", DataType::Float),
            Column::new("is_present", DataType::Bool),
            Column::new("is_late", DataType::Bool),
            Column::new("is_absent", DataType::Bool),
            Column::new("is_extended_shift", DataType::Bool),
            Column::new("has_differential", DataType::Bool),
        ]
    }

    /// Minimal attendance_detail with the columns the metrics read
    fn attendance() -> Table {
        Table::from_rows(
            attendance_columns(),
            vec![
                attendance_row(1, "RN", 3, 12.0, 4.0, true),
                attendance_row(2, "CNA", 3, 8.0, 0.0, true),
                attendance_row(1, "RN", 4, 8.0, 0.0, true),
                attendance_row(2, "CNA", 4, 0.0, 0.0, false),
            ],
        )
        .unwrap()
    }

    fn attendance_row(
        emp: i64,
        role: &str,
        day: u32,
        hours: f64,
        ot: f64,
        present: bool,
    ) -> Vec<Value> {
        vec![
            Value::Int(emp),
            "ICU".into(),
            role.into(),
            date(day),
            date(3),
            "2024-06".into(),
            "Day".into(),
            "Weekday".into(),
            Value::Float(hours),
            Value::Float(ot),
            Value::Float(0.0),
            present.into(),
            false.into(),
            (!present).into(),
            (hours >= 12.0).into(),
            false.into(),
        ]
    }

    fn inputs_with(relation: &str, table: Table) -> Inputs {
        let mut inputs = Inputs::new();
        inputs.insert(
            EntityName::new(Namespace::Business, relation).unwrap(),
            Arc::new(table),
        );
        inputs
    }

    #[test]
    fn test_attendance_metrics_rates() {
        let inputs = inputs_with(ATTENDANCE_DETAIL, attendance());
        let table = attendance_metrics(&inputs, &mut ctx()).unwrap();
        assert_eq!(table.len(), 1);

        let row = table.rows().next().unwrap();
        assert_eq!(row.get("total_records"), &Value::Int(4));
        assert_eq!(row.get("present_count"), &Value::Int(3));
        assert_eq!(row.f64("attendance_rate_pct"), Some(75.0));
        assert_eq!(row.f64("total_hours"), Some(28.0));
        assert_eq!(row.f64("overtime_pct"), Some(14.29));
    }

    #[test]
    fn test_staffing_ratios_count_understaffed_days() {
        let inputs = inputs_with(ATTENDANCE_DETAIL, attendance());
        let table = department_staffing_ratios(&inputs, &mut ctx()).unwrap();
        assert_eq!(table.len(), 1);

        let row = table.rows().next().unwrap();
        assert_eq!(row.get("days_observed"), &Value::Int(2));
        assert_eq!(row.get("understaffed_days"), &Value::Int(1));
        assert_eq!(row.f64("understaffed_days_pct"), Some(50.0));
        assert_eq!(row.f64("avg_rn_count"), Some(1.0));
        assert_eq!(row.f64("avg_cna_count"), Some(0.5));
        assert_eq!(row.get("min_total_staff_count"), &Value::Int(1));
    }

    #[test]
    fn test_staffing_ratios_count_full_call_out() {
        let mut table = attendance();
        table.push_row(attendance_row(1, "RN", 5, 0.0, 0.0, false)).unwrap();
        table.push_row(attendance_row(2, "CNA", 5, 0.0, 0.0, false)).unwrap();
        let inputs = inputs_with(ATTENDANCE_DETAIL, table);
        let out = department_staffing_ratios(&inputs, &mut ctx()).unwrap();

        let row = out.rows().next().unwrap();
        assert_eq!(row.get("days_observed"), &Value::Int(3));
        assert_eq!(row.get("understaffed_days"), &Value::Int(2));
        assert_eq!(row.get("min_total_staff_count"), &Value::Int(0));
        assert_eq!(row.f64("understaffed_days_pct"), Some(66.67));
    }

    #[test]
    fn test_shift_coverage_zero_hours_is_zero_pct() {
        let idle = attendance().filter(|r| r.f64("hours") == Some(0.0));
        let inputs = inputs_with(ATTENDANCE_DETAIL, idle);
        let table = shift_coverage_metrics(&inputs, &mut ctx()).unwrap();

        let row = table.rows().next().unwrap();
        assert_eq!(row.str("year_month"), Some("2024-06"));
        assert_eq!(row.f64("overtime_pct"), Some(0.0));
        assert_eq!(row.f64("differential_pct"), Some(0.0));
    }

    #[test]
    fn test_benefit_enrollment_labels_missing_plan() {
        let table = Table::from_rows(
            vec![
                Column::new("emp_id", DataType::Int),
                Column::new("pay_date", DataType::Date),
                Column::new("benefit_plan_type", DataType::Text),
                Column::new("current_arrears", DataType::Float),
            ],
            vec![
                vec![Value::Int(1), date(1), "Medical".into(), Value::Float(100.0)],
                vec![Value::Int(1), date(15), "Medical".into(), Value::Float(50.0)],
                vec![Value::Int(2), date(15), Value::Null, Value::Null],
            ],
        )
        .unwrap();
        let inputs = inputs_with(PAYROLL_DETAIL, table);
        let out = benefit_enrollment_metrics(&inputs, &mut ctx()).unwrap();

        let rows: Vec<_> = out.rows().collect();
        assert_eq!(rows[0].str("benefit_plan_type"), Some("Medical"));
        assert_eq!(rows[0].get("employee_count"), &Value::Int(1));
        assert_eq!(rows[0].f64("total_current_arrears"), Some(150.0));
        assert_eq!(rows[1].str("benefit_plan_type"), Some("None"));
        assert_eq!(rows[1].get("avg_current_arrears"), &Value::Null);
    }
}
