//! Business entities
//!
//! Denormalised, classified compositions of the staging entities. Employee
//! attributes are always joined on the internal `emp_id` surrogate key.

use super::classify::{
    attendance_status, day_type, has_phrase, is_overtime_code, shift_type, whole_years,
    AttendanceInput, BurnoutInput, AGE_BAND, BURNOUT_RISK, CARE_UNIT, CLINICAL_ROLE, TENURE_BAND,
};
use super::derive::{
    direct_report_counts, effective_hourly_rate, estimated_annual_salary, full_name, rate_premium,
};
use crate::core::catalog::{BuildContext, EntityDefinition, Inputs};
use crate::core::relation::{round_to, safe_pct, Aggregate, JoinKind, TimeGrain};
use crate::core::staging::models::{STG_ATTENDANCE, STG_EMPLOYEES, STG_PAYROLL};
use crate::core::staging::SOURCE_COLUMN;
use crate::domain::{
    Column, DataType, EntityName, Namespace, Result, Row, SemanticError, Table, Value,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const EMPLOYEE_SUMMARY: &str = "employee_summary";
pub const PAYROLL_DETAIL: &str = "payroll_detail";
pub const ATTENDANCE_DETAIL: &str = "attendance_detail";
pub const CLINICAL_STAFF_SUMMARY: &str = "clinical_staff_summary";

fn name(namespace: Namespace, relation: &str) -> Result<EntityName> {
    EntityName::new(namespace, relation).map_err(SemanticError::Catalog)
}

pub fn definitions() -> Result<Vec<EntityDefinition>> {
    let staging = |r: &str| name(Namespace::Staging, r);
    let business = |r: &str| name(Namespace::Business, r);

    Ok(vec![
        EntityDefinition::derived(
            business(EMPLOYEE_SUMMARY)?,
            "Employee master with year-to-date payroll, benefits, arrears, bands and direct reports",
            vec![staging(STG_EMPLOYEES)?, staging(STG_PAYROLL)?],
            employee_summary,
        ),
        EntityDefinition::derived(
            business(PAYROLL_DETAIL)?,
            "Payroll lines with employee attributes and effective hourly rate",
            vec![staging(STG_PAYROLL)?, staging(STG_EMPLOYEES)?],
            payroll_detail,
        ),
        EntityDefinition::derived(
            business(ATTENDANCE_DETAIL)?,
            "Attendance rows with shift, calendar and overtime classification",
            vec![staging(STG_ATTENDANCE)?, staging(STG_EMPLOYEES)?],
            attendance_detail,
        ),
        EntityDefinition::derived(
            business(CLINICAL_STAFF_SUMMARY)?,
            "Employee summary with clinical role, care unit, attendance rate and burnout risk",
            vec![business(EMPLOYEE_SUMMARY)?, business(ATTENDANCE_DETAIL)?],
            clinical_staff_summary,
        ),
    ])
}

fn is_active(status: Option<&str>) -> bool {
    status.is_some_and(|s| has_phrase(s, &["active"]))
}

fn date_in(row: &Row<'_>, column: &str, from: NaiveDate, to: NaiveDate) -> bool {
    row.get(column)
        .as_date()
        .is_some_and(|d| d >= from && d <= to)
}

/// Employee attributes carried onto fact rows
fn employee_attributes(employees: &Table) -> Result<Table> {
    employees
        .select(&["emp_id", "employee_number", "first_name", "last_name", "department", "job_title", "hourly_rate"])?
        .with_column("full_name", DataType::Text, |r| {
            full_name(r.str("first_name"), r.str("last_name")).into()
        })?
        .select(&["emp_id", "employee_number", "full_name", "department", "job_title", "hourly_rate"])
}

fn employee_summary(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let employees = inputs.get(STG_EMPLOYEES)?;
    let payroll = inputs.get(STG_PAYROLL)?;
    let as_of = ctx.as_of;
    let annual_hours = ctx.config.pipeline.annual_hours;
    let year_start = TimeGrain::Year.start(as_of);

    let reports = direct_report_counts(employees, "emp_id", "reports_to")?;

    let base = employees
        .select(&[
            "emp_id",
            "employee_number",
            "first_name",
            "last_name",
            "department",
            "job_title",
            "employment_status",
            "hire_date",
            "termination_date",
            "birth_date",
            "reports_to",
            "pay_type",
            "hourly_rate",
            "annual_salary",
            "t_1099_flag",
        ])?
        .with_column("full_name", DataType::Text, |r| {
            full_name(r.str("first_name"), r.str("last_name")).into()
        })?
        .with_column("is_active", DataType::Bool, |r| {
            is_active(r.str("employment_status")).into()
        })?
        .with_column("is_contractor", DataType::Bool, |r| {
            (r.get("t_1099_flag").as_bool() == Some(true)).into()
        })?
        .with_column("estimated_annual_salary", DataType::Float, |r| {
            estimated_annual_salary(r.f64("annual_salary"), r.f64("hourly_rate"), annual_hours).into()
        })?
        .with_column("tenure_years", DataType::Float, |r| {
            tenure_end(r, as_of)
                .zip(r.get("hire_date").as_date())
                .filter(|(end, hire)| end >= hire)
                .map(|(end, hire)| round_to((end - hire).num_days() as f64 / 365.25, 1))
                .into()
        })?
        .with_column("tenure_band", DataType::Text, |r| {
            let years = r
                .get("hire_date")
                .as_date()
                .zip(tenure_end(r, as_of))
                .and_then(|(hire, end)| whole_years(hire, end));
            TENURE_BAND.classify(&years).into()
        })?
        .with_column("age", DataType::Int, |r| {
            r.get("birth_date")
                .as_date()
                .and_then(|b| whole_years(b, as_of))
                .into()
        })?
        .with_column("age_band", DataType::Text, |r| {
            let age = r.get("birth_date").as_date().and_then(|b| whole_years(b, as_of));
            AGE_BAND.classify(&age).into()
        })?
        .with_column("direct_reports", DataType::Int, |r| {
            Value::Int(reports.get(r.get("emp_id")).copied().unwrap_or(0))
        })?;

    let ytd = payroll
        .filter(|r| date_in(r, "pay_date", year_start, as_of))
        .group_by(
            &["emp_id"],
            &[
                Aggregate::sum("ytd_gross_pay", "gross_pay"),
                Aggregate::sum("ytd_net_pay", "net_pay"),
                Aggregate::sum("ytd_regular_hours", "regular_hours"),
                Aggregate::sum("ytd_overtime_hours", "overtime_hours"),
            ],
        )?;
    let (joined, stats) = base.join(&ytd, "emp_id", "emp_id", JoinKind::Left)?;
    ctx.record_join("employees x ytd payroll", &stats);

    let through_as_of = payroll.filter(|r| r.get("pay_date").as_date().map_or(true, |d| d <= as_of));
    let benefits = through_as_of.group_by(
        &["emp_id"],
        &[
            Aggregate::count_distinct("num_benefit_plans", "benefit_plan_name"),
            Aggregate::string_agg("benefit_plan_types", "benefit_plan_type"),
        ],
    )?;
    let (joined, stats) = joined.join(&benefits, "emp_id", "emp_id", JoinKind::Left)?;
    ctx.record_join("employees x benefits", &stats);

    let arrears = latest_arrears(&through_as_of)?;
    let (joined, stats) = joined.join(&arrears, "emp_id", "emp_id", JoinKind::Left)?;
    ctx.record_join("employees x arrears", &stats);

    joined
        .fill_null(
            &["ytd_gross_pay", "ytd_net_pay", "ytd_regular_hours", "ytd_overtime_hours", "total_current_arrears"],
            &Value::Float(0.0),
        )?
        .fill_null(&["num_benefit_plans"], &Value::Int(0))?
        .select(&[
            "emp_id",
            "employee_number",
            "full_name",
            "first_name",
            "last_name",
            "department",
            "job_title",
            "employment_status",
            "is_active",
            "hire_date",
            "termination_date",
            "birth_date",
            "reports_to",
            "pay_type",
            "hourly_rate",
            "annual_salary",
            "estimated_annual_salary",
            "is_contractor",
            "tenure_years",
            "tenure_band",
            "age",
            "age_band",
            "direct_reports",
            "ytd_gross_pay",
            "ytd_net_pay",
            "ytd_regular_hours",
            "ytd_overtime_hours",
            "num_benefit_plans",
            "benefit_plan_types",
            "total_current_arrears",
            "corp_id",
        ])
}

/// Termination date if it precedes the run date, otherwise the run date
fn tenure_end(row: &Row<'_>, as_of: NaiveDate) -> Option<NaiveDate> {
    match row.get("termination_date").as_date() {
        Some(term) if term < as_of => Some(term),
        _ => Some(as_of),
    }
}

/// Current arrears summed over each employee's most recent pay date
fn latest_arrears(payroll: &Table) -> Result<Table> {
    struct Latest {
        pay_date: Option<NaiveDate>,
        arrears: f64,
        corp_id: Value,
    }

    let mut latest: BTreeMap<Value, Latest> = BTreeMap::new();
    for row in payroll.rows() {
        let pay_date = row.get("pay_date").as_date();
        let arrears = row.f64("current_arrears").unwrap_or(0.0);
        let corp_id = row.get("corp_id").clone();
        let entry = latest.entry(row.get("emp_id").clone()).or_insert(Latest {
            pay_date,
            arrears: 0.0,
            corp_id: Value::Null,
        });
        if pay_date > entry.pay_date {
            *entry = Latest {
                pay_date,
                arrears: 0.0,
                corp_id: Value::Null,
            };
        }
        if pay_date == entry.pay_date {
            entry.arrears += arrears;
            if entry.corp_id.is_null() {
                entry.corp_id = corp_id;
            }
        }
    }

    Table::from_rows(
        vec![
            Column::required("emp_id", DataType::Int),
            Column::new("total_current_arrears", DataType::Float),
            Column::new("corp_id", DataType::Text),
        ],
        latest
            .into_iter()
            .map(|(emp_id, l)| vec![emp_id, Value::Float(round_to(l.arrears, 2)), l.corp_id])
            .collect(),
    )
}

fn payroll_detail(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let payroll = inputs.get(STG_PAYROLL)?;
    let employees = employee_attributes(inputs.get(STG_EMPLOYEES)?)?;

    let lines = payroll.select(&[
        "emp_id",
        "pay_date",
        "gross_pay",
        "net_pay",
        "regular_hours",
        "overtime_hours",
        "benefit_plan_type",
        "benefit_plan_name",
        "coverage_tier",
        "current_arrears",
        "total_arrears",
        "corp_id",
    ])?;
    let (joined, stats) = lines.join(&employees, "emp_id", "emp_id", JoinKind::Left)?;
    ctx.record_join("payroll x employees", &stats);

    joined
        .with_column("year_month", DataType::Text, |r| {
            r.get("pay_date")
                .as_date()
                .map(|d| TimeGrain::Month.label(d))
                .into()
        })?
        .with_column("total_hours", DataType::Float, |r| {
            match (r.f64("regular_hours"), r.f64("overtime_hours")) {
                (None, None) => Value::Null,
                (reg, ot) => Value::Float(round_to(reg.unwrap_or(0.0) + ot.unwrap_or(0.0), 2)),
            }
        })?
        .with_column("effective_hourly_rate", DataType::Float, |r| {
            let hours = match (r.f64("regular_hours"), r.f64("overtime_hours")) {
                (None, None) => None,
                (reg, ot) => Some(reg.unwrap_or(0.0) + ot.unwrap_or(0.0)),
            };
            effective_hourly_rate(r.f64("gross_pay"), hours, r.f64("hourly_rate")).into()
        })?
        .rename("hourly_rate", "base_hourly_rate")?
        .select(&[
            "emp_id",
            "employee_number",
            "full_name",
            "department",
            "job_title",
            "pay_date",
            "year_month",
            "gross_pay",
            "net_pay",
            "regular_hours",
            "overtime_hours",
            "total_hours",
            "base_hourly_rate",
            "effective_hourly_rate",
            "benefit_plan_type",
            "benefit_plan_name",
            "coverage_tier",
            "current_arrears",
            "total_arrears",
            "corp_id",
        ])
}

fn attendance_detail(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let attendance = inputs.get(STG_ATTENDANCE)?;
    let employees = employee_attributes(inputs.get(STG_EMPLOYEES)?)?.rename("hourly_rate", "base_rate")?;
    let extended_hours = ctx.config.pipeline.extended_shift_hours;

    let rows = attendance
        .select(&[
            "emp_id",
            "work_date",
            "shift",
            "clock_in_timestamp",
            "hours",
            "rate",
            "earning_code",
            "status",
            "shift_diff_hours",
            SOURCE_COLUMN,
        ])?
        .rename(SOURCE_COLUMN, "source_batch")?;
    let (joined, stats) = rows.join(&employees, "emp_id", "emp_id", JoinKind::Left)?;
    ctx.record_join("attendance x employees", &stats);

    let status_of = |r: &Row<'_>| {
        attendance_status(&AttendanceInput {
            status: r.str("status"),
            hours: r.f64("hours"),
        })
    };

    joined
        .with_column("clinical_role", DataType::Text, |r| {
            CLINICAL_ROLE.classify(r.str("job_title").unwrap_or("")).into()
        })?
        .with_column("shift_type", DataType::Text, |r| {
            shift_type(r.str("shift"), r.get("clock_in_timestamp").as_timestamp()).into()
        })?
        .with_column("day_type", DataType::Text, |r| {
            r.get("work_date").as_date().map(day_type).into()
        })?
        .with_column("week_start", DataType::Date, |r| {
            r.get("work_date")
                .as_date()
                .map(|d| TimeGrain::Week.start(d))
                .into()
        })?
        .with_column("week_number", DataType::Int, |r| {
            r.get("work_date")
                .as_date()
                .map(|d| i64::from(chrono::Datelike::iso_week(&d).week()))
                .into()
        })?
        .with_column("year_month", DataType::Text, |r| {
            r.get("work_date")
                .as_date()
                .map(|d| TimeGrain::Month.label(d))
                .into()
        })?
        .with_column("overtime_hours", DataType::Float, |r| {
            if is_overtime_code(r.str("earning_code")) {
                Value::Float(r.f64("hours").unwrap_or(0.0))
            } else {
                Value::Float(0.0)
            }
        })?
        .with_column("rate_premium", DataType::Float, |r| {
            rate_premium(r.f64("rate"), r.f64("base_rate")).into()
        })?
        .with_column("attendance_status", DataType::Text, |r| status_of(r).into())?
        .with_column("is_absent", DataType::Bool, |r| (status_of(r) == "Absent").into())?
        .with_column("is_late", DataType::Bool, |r| (status_of(r) == "Late").into())?
        .with_column("is_present", DataType::Bool, |r| {
            matches!(status_of(r), "Present" | "Late").into()
        })?
        .with_column("is_extended_shift", DataType::Bool, |r| {
            r.f64("hours").is_some_and(|h| h >= extended_hours).into()
        })?
        .with_column("has_differential", DataType::Bool, |r| {
            r.f64("shift_diff_hours").is_some_and(|h| h > 0.0).into()
        })?
        .select(&[
            "emp_id",
            "employee_number",
            "full_name",
            "department",
            "job_title",
            "clinical_role",
            "work_date",
            "shift",
            "shift_type",
            "day_type",
            "week_start",
            "week_number",
            "year_month",
            "clock_in_timestamp",
            "hours",
            "overtime_hours",
            "rate",
            "base_rate",
            "rate_premium",
            "earning_code",
            "status",
            "attendance_status",
            "is_absent",
            "is_late",
            "is_present",
            "is_extended_shift",
            "shift_diff_hours",
            "has_differential",
            "source_batch",
        ])
}

fn clinical_staff_summary(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let summary = inputs.get(EMPLOYEE_SUMMARY)?;
    let attendance = inputs.get(ATTENDANCE_DETAIL)?;
    let as_of = ctx.as_of;
    let year_start = TimeGrain::Year.start(as_of);

    let ytd_attendance = attendance
        .filter(|r| date_in(r, "work_date", year_start, as_of))
        .group_by(
            &["emp_id"],
            &[
                Aggregate::count("shifts_recorded"),
                Aggregate::count_if("shifts_present", "is_present"),
                Aggregate::count_if("shifts_absent", "is_absent"),
                Aggregate::count_if("extended_shifts_count", "is_extended_shift"),
            ],
        )?;
    let (joined, stats) = summary.join(&ytd_attendance, "emp_id", "emp_id", JoinKind::Left)?;
    ctx.record_join("employee summary x ytd attendance", &stats);

    let joined = joined.fill_null(
        &["shifts_recorded", "shifts_present", "shifts_absent", "extended_shifts_count"],
        &Value::Int(0),
    )?;

    let payroll_hours = |r: &Row<'_>| {
        r.f64("ytd_regular_hours").unwrap_or(0.0) + r.f64("ytd_overtime_hours").unwrap_or(0.0)
    };
    let overtime_pct = move |r: &Row<'_>| -> Option<f64> {
        let total = payroll_hours(r);
        (total > 0.0).then(|| safe_pct(r.f64("ytd_overtime_hours").unwrap_or(0.0), Some(total)))
    };

    joined
        .with_column("clinical_role", DataType::Text, |r| {
            CLINICAL_ROLE.classify(r.str("job_title").unwrap_or("")).into()
        })?
        .with_column("care_unit_type", DataType::Text, |r| {
            CARE_UNIT.classify(r.str("department").unwrap_or("")).into()
        })?
        .with_column("attendance_rate_pct", DataType::Float, |r| {
            let present = r.f64("shifts_present").unwrap_or(0.0);
            let absent = r.f64("shifts_absent").unwrap_or(0.0);
            safe_pct(present, Some(present + absent)).into()
        })?
        .with_column("overtime_percentage", DataType::Float, |r| {
            overtime_pct(r).unwrap_or(0.0).into()
        })?
        .with_column("burnout_risk_level", DataType::Text, |r| {
            let recorded = r.get("shifts_recorded").as_i64().unwrap_or(0);
            let input = BurnoutInput {
                overtime_pct: overtime_pct(r),
                extended_shifts: (recorded > 0)
                    .then(|| r.get("extended_shifts_count").as_i64().unwrap_or(0)),
            };
            BURNOUT_RISK.classify(&input).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemanticConfig;
    use std::sync::Arc;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn d(m: u32, day: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(2024, m, day).unwrap())
    }

    fn ctx(entity: &str) -> BuildContext {
        BuildContext::new(entity.parse().unwrap(), as_of(), Arc::new(SemanticConfig::default()))
    }

    fn staging_employees() -> Table {
        let columns = vec![
            Column::required("emp_id", DataType::Int),
            Column::new("employee_number", DataType::Text),
            Column::new("first_name", DataType::Text),
            Column::new("last_name", DataType::Text),
            Column::new("department", DataType::Text),
            Column::new("job_title", DataType::Text),
            Column::new("employment_status", DataType::Text),
            Column::new("hire_date", DataType::Date),
            Column::new("termination_date", DataType::Date),
            Column::new("birth_date", DataType::Date),
            Column::new("reports_to", DataType::Int),
            Column::new("pay_type", DataType::Text),
            Column::new("hourly_rate", DataType::Float),
            Column::new("annual_salary", DataType::Float),
            Column::new("t_1099_flag", DataType::Bool),
        ];
        let employee = |id: i64, first: &str, title: &str, dept: &str, manager: Value, rate: f64| {
            vec![
                Value::Int(id),
                Value::text(format!("E{id}")),
                first.into(),
                "Smith".into(),
                dept.into(),
                title.into(),
                "Active".into(),
                Value::Date(NaiveDate::from_ymd_opt(2019, 3, 1).unwrap()),
                Value::Null,
                Value::Date(NaiveDate::from_ymd_opt(1990, 7, 15).unwrap()),
                manager,
                "Hourly".into(),
                Value::Float(rate),
                Value::Null,
                Value::Bool(false),
            ]
        };
        Table::from_rows(
            columns,
            vec![
                employee(100, "Ann", "Registered Nurse", "Medical ICU", Value::Int(102), 40.0),
                employee(101, "Bo", "CNA", "Emergency", Value::Int(102), 20.0),
                employee(102, "Cy", "Nurse Manager", "Medical ICU", Value::Int(102), 50.0),
            ],
        )
        .unwrap()
    }

    fn staging_payroll() -> Table {
        let columns = [
            ("emp_id", DataType::Int),
            ("pay_date", DataType::Date),
            ("gross_pay", DataType::Float),
            ("net_pay", DataType::Float),
            ("regular_hours", DataType::Float),
            ("overtime_hours", DataType::Float),
            ("benefit_plan_type", DataType::Text),
            ("benefit_plan_name", DataType::Text),
            ("coverage_tier", DataType::Text),
            ("current_arrears", DataType::Float),
            ("total_arrears", DataType::Float),
            ("corp_id", DataType::Text),
        ]
        .iter()
        .map(|(n, t)| Column::new(*n, *t))
        .collect();
        let line = |id: i64, date: Value, gross: f64, reg: f64, ot: f64, plan: &str, arrears: f64| {
            vec![
                Value::Int(id),
                date,
                Value::Float(gross),
                Value::Float(gross * 0.75),
                Value::Float(reg),
                Value::Float(ot),
                "Medical".into(),
                plan.into(),
                "Employee".into(),
                Value::Float(arrears),
                Value::Float(arrears),
                "C1".into(),
            ]
        };
        Table::from_rows(
            columns,
            vec![
                line(100, d(5, 15), 3200.0, 80.0, 0.0, "PPO", 100.0),
                line(100, d(6, 15), 3800.0, 80.0, 20.0, "PPO", 600.0),
                line(100, d(6, 15), 0.0, 0.0, 0.0, "Dental", 50.0),
                line(101, d(6, 15), 1600.0, 0.0, 0.0, "HMO", 0.0),
            ],
        )
        .unwrap()
    }

    fn staging_inputs() -> Inputs {
        let mut inputs = Inputs::new();
        inputs.insert("staging.stg_employees".parse().unwrap(), Arc::new(staging_employees()));
        inputs.insert("staging.stg_payroll".parse().unwrap(), Arc::new(staging_payroll()));
        inputs
    }

    fn find<'a>(table: &'a Table, emp_id: i64) -> Row<'a> {
        table
            .rows()
            .find(|r| r.get("emp_id") == &Value::Int(emp_id))
            .unwrap()
    }

    #[test]
    fn test_employee_summary_aggregates() {
        let mut ctx = ctx("business.employee_summary");
        let table = employee_summary(&staging_inputs(), &mut ctx).unwrap();
        assert_eq!(table.len(), 3);

        let ann = find(&table, 100);
        assert_eq!(ann.str("full_name"), Some("Ann Smith"));
        assert_eq!(ann.f64("ytd_gross_pay"), Some(7000.0));
        assert_eq!(ann.f64("ytd_overtime_hours"), Some(20.0));
        assert_eq!(ann.get("num_benefit_plans"), &Value::Int(2));
        assert_eq!(ann.str("benefit_plan_types"), Some("Medical"));
        assert_eq!(ann.f64("total_current_arrears"), Some(650.0));
        assert_eq!(ann.f64("estimated_annual_salary"), Some(83_200.0));
        assert_eq!(ann.str("tenure_band"), Some("3-5 years"));
        assert_eq!(ann.str("age_band"), Some("25-34"));

        let cy = find(&table, 102);
        assert_eq!(cy.get("direct_reports"), &Value::Int(2));
        assert_eq!(cy.f64("ytd_gross_pay"), Some(0.0));
        assert_eq!(cy.get("num_benefit_plans"), &Value::Int(0));
        assert!(ctx.diagnostics.fan_outs.is_empty());
    }

    #[test]
    fn test_payroll_detail_effective_rate_guards() {
        let mut ctx = ctx("business.payroll_detail");
        let table = payroll_detail(&staging_inputs(), &mut ctx).unwrap();
        assert_eq!(table.len(), 4);

        let rates: Vec<f64> = table.rows().filter_map(|r| r.f64("effective_hourly_rate")).collect();
        // 3200/80, 3800/100, zero hours -> base 40, zero hours -> base 20
        assert_eq!(rates, vec![40.0, 38.0, 40.0, 20.0]);
        assert_eq!(table.rows().next().unwrap().str("year_month"), Some("2024-05"));
    }

    #[test]
    fn test_duplicate_employee_key_reports_fan_out() {
        let mut employees = staging_employees();
        let duplicate = employees.raw_rows()[0].clone();
        employees.push_row(duplicate).unwrap();

        let mut inputs = Inputs::new();
        inputs.insert("staging.stg_employees".parse().unwrap(), Arc::new(employees));
        inputs.insert("staging.stg_payroll".parse().unwrap(), Arc::new(staging_payroll()));

        let mut ctx = ctx("business.payroll_detail");
        let table = payroll_detail(&inputs, &mut ctx).unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(ctx.diagnostics.fan_outs.len(), 1);
        assert_eq!(ctx.diagnostics.fan_outs[0].extra_rows, 3);
    }
}
