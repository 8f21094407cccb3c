//! Alert rules
//!
//! Each rule is a pure threshold check over one business or metrics relation
//! and yields zero or more [`Alert`]s. Rules never see each other's output.

use crate::config::{AlertConfig, Thresholds};
use crate::core::relation::{round_to, Aggregate};
use crate::domain::{Result, Row, SemanticError, Table, Value};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alert priority; `High` sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Sort rank, 1 for `High`
    pub fn rank(&self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// Highest tier whose threshold the value reaches
    pub fn at_least(value: f64, thresholds: &Thresholds) -> Option<Self> {
        if value >= thresholds.high {
            Some(Priority::High)
        } else if value >= thresholds.medium {
            Some(Priority::Medium)
        } else if value >= thresholds.low {
            Some(Priority::Low)
        } else {
            None
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("invalid priority '{}', expected high, medium or low", other)),
        }
    }
}

/// One alert row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: String,
    pub priority: Priority,
    pub subject: String,
    pub description: String,
    pub metric_value: f64,
    pub detail: String,
}

impl Alert {
    fn new(
        alert_type: &str,
        priority: Priority,
        subject: String,
        description: String,
        metric_value: f64,
        detail: String,
    ) -> Self {
        Self {
            alert_type: alert_type.to_string(),
            priority,
            subject,
            description,
            metric_value: round_to(metric_value, 2),
            detail,
        }
    }
}

/// Orders alerts by priority, then alert type, then subject
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.alert_type.cmp(&b.alert_type))
            .then_with(|| a.subject.cmp(&b.subject))
    });
}

/// `Full Name (emp_id)`, or just the id when the name is unknown
fn employee_subject(row: &Row<'_>) -> String {
    let id = row.get("emp_id");
    match row.str("full_name") {
        Some(name) => format!("{} ({})", name, id),
        None => id.to_string(),
    }
}

/// Attendance rows with `work_date` in `(as_of - days, as_of]`
fn in_window(attendance: &Table, as_of: NaiveDate, days: u32) -> Table {
    let start = as_of
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    attendance.filter(|r| {
        r.get("work_date")
            .as_date()
            .is_some_and(|d| d > start && d <= as_of)
    })
}

pub fn high_arrears(summary: &Table, config: &AlertConfig) -> Vec<Alert> {
    summary
        .rows()
        .filter_map(|r| {
            let arrears = r.f64("total_current_arrears")?;
            let priority = Priority::at_least(arrears, &config.high_arrears)?;
            Some(Alert::new(
                "high_arrears",
                priority,
                employee_subject(&r),
                format!("Outstanding arrears of {:.2}", arrears),
                arrears,
                format!("department: {}", r.get("department")),
            ))
        })
        .collect()
}

pub fn excessive_overtime(
    attendance: &Table,
    as_of: NaiveDate,
    config: &AlertConfig,
) -> Result<Vec<Alert>> {
    let totals = in_window(attendance, as_of, config.window_days).group_by(
        &["emp_id"],
        &[
            Aggregate::max("full_name", "full_name"),
            Aggregate::max("department", "department"),
            Aggregate::sum("overtime_hours", "overtime_hours"),
        ],
    )?;

    Ok(totals
        .rows()
        .filter_map(|r| {
            let hours = r.f64("overtime_hours")?;
            let priority = Priority::at_least(hours, &config.excessive_overtime)?;
            Some(Alert::new(
                "excessive_overtime",
                priority,
                employee_subject(&r),
                format!(
                    "{:.1} overtime hours in the last {} days",
                    hours, config.window_days
                ),
                hours,
                format!("department: {}", r.get("department")),
            ))
        })
        .collect())
}

pub fn burnout_risk(clinical: &Table) -> Vec<Alert> {
    clinical
        .rows()
        .filter(|r| {
            r.str("burnout_risk_level") == Some("High Risk")
                && r.get("is_active").as_bool() == Some(true)
        })
        .map(|r| {
            let overtime = r.f64("overtime_percentage").unwrap_or(0.0);
            Alert::new(
                "burnout_risk",
                Priority::Medium,
                employee_subject(&r),
                format!("High burnout risk ({} clinical role)", r.get("clinical_role")),
                overtime,
                format!(
                    "overtime: {:.2}%, extended shifts: {}",
                    overtime,
                    r.get("extended_shifts_count")
                ),
            )
        })
        .collect()
}

/// Latest non-null value of a column
fn latest(table: &Table, column: &str) -> Result<Option<Value>> {
    Ok(table
        .column_values(column)?
        .into_iter()
        .filter(|v| !v.is_null())
        .max()
        .cloned())
}

pub fn low_attendance(metrics: &Table, config: &AlertConfig) -> Result<Vec<Alert>> {
    let Some(month) = latest(metrics, "year_month")? else {
        return Ok(Vec::new());
    };

    Ok(metrics
        .rows()
        .filter(|r| r.get("year_month") == &month)
        .filter_map(|r| {
            let observed =
                r.f64("present_count").unwrap_or(0.0) + r.f64("absent_count").unwrap_or(0.0);
            if observed <= 0.0 {
                return None;
            }
            let rate = r.f64("attendance_rate_pct")?;
            let priority = if rate < config.low_attendance_high_below {
                Priority::High
            } else if rate < config.low_attendance_medium_below {
                Priority::Medium
            } else {
                return None;
            };
            Some(Alert::new(
                "low_attendance",
                priority,
                r.get("department").to_string(),
                format!("Attendance rate {:.2}% in {}", rate, month),
                rate,
                format!(
                    "present: {}, absent: {}",
                    r.get("present_count"),
                    r.get("absent_count")
                ),
            ))
        })
        .collect())
}

pub fn understaffed_unit(ratios: &Table, config: &AlertConfig) -> Result<Vec<Alert>> {
    let latest_period = ratios
        .rows()
        .filter_map(|r| Some((r.get("year").as_i64()?, r.get("month").as_i64()?)))
        .max();
    let Some((year, month)) = latest_period else {
        return Ok(Vec::new());
    };

    Ok(ratios
        .rows()
        .filter(|r| r.get("year").as_i64() == Some(year) && r.get("month").as_i64() == Some(month))
        .filter_map(|r| {
            let pct = r.f64("understaffed_days_pct")?;
            let priority = if pct >= config.understaffed_high_pct {
                Priority::High
            } else if pct >= config.understaffed_medium_pct {
                Priority::Medium
            } else {
                return None;
            };
            Some(Alert::new(
                "understaffed_unit",
                priority,
                format!("{} / {}", r.get("department"), r.get("shift_type")),
                format!("Understaffed on {:.2}% of days in {}-{:02}", pct, year, month),
                pct,
                format!(
                    "understaffed days: {} of {}",
                    r.get("understaffed_days"),
                    r.get("days_observed")
                ),
            ))
        })
        .collect())
}

pub fn frequent_absence(
    attendance: &Table,
    as_of: NaiveDate,
    config: &AlertConfig,
) -> Result<Vec<Alert>> {
    let counts = in_window(attendance, as_of, config.window_days).group_by(
        &["emp_id"],
        &[
            Aggregate::max("full_name", "full_name"),
            Aggregate::max("department", "department"),
            Aggregate::count_if("absences", "is_absent"),
        ],
    )?;
    let minimum = i64::from(config.frequent_absence_min);

    Ok(counts
        .rows()
        .filter_map(|r| {
            let absences = r.get("absences").as_i64()?;
            if absences < minimum {
                return None;
            }
            Some(Alert::new(
                "frequent_absence",
                Priority::Low,
                employee_subject(&r),
                format!("{} absences in the last {} days", absences, config.window_days),
                absences as f64,
                format!("department: {}", r.get("department")),
            ))
        })
        .collect())
}

/// Converts sorted alerts into the feed relation
pub fn alerts_to_table(alerts: Vec<Alert>, detected_at: NaiveDate) -> Result<Table> {
    use crate::domain::{Column, DataType};

    let columns = vec![
        Column::required("alert_type", DataType::Text),
        Column::required("priority", DataType::Text),
        Column::required("subject", DataType::Text),
        Column::required("description", DataType::Text),
        Column::required("metric_value", DataType::Float),
        Column::new("detail", DataType::Text),
        Column::required("detected_at", DataType::Date),
    ];
    let rows = alerts
        .into_iter()
        .map(|a| {
            vec![
                Value::Text(a.alert_type),
                Value::text(a.priority.as_str()),
                Value::Text(a.subject),
                Value::Text(a.description),
                Value::Float(a.metric_value),
                Value::Text(a.detail),
                Value::Date(detected_at),
            ]
        })
        .collect();
    Table::from_rows(columns, rows)
        .map_err(|e| SemanticError::evaluation("alerts.alert_feed", e.to_string()))
}
