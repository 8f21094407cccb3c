//! Alert feed
//!
//! `alerts.alert_feed` is the union of every rule in [`rules`], sorted by
//! priority, alert type and subject. The feed is an ordinary catalog entity,
//! so it is materialized and served like any metric.

pub mod rules;

pub use rules::{sort_alerts, Alert, Priority};

use crate::core::business::{ATTENDANCE_DETAIL, CLINICAL_STAFF_SUMMARY, EMPLOYEE_SUMMARY};
use crate::core::catalog::{BuildContext, EntityDefinition, Inputs};
use crate::core::metrics::{ATTENDANCE_METRICS, DEPARTMENT_STAFFING_RATIOS};
use crate::domain::{EntityName, Namespace, Result, SemanticError, Table};

pub const ALERT_FEED: &str = "alert_feed";

pub fn definitions() -> Result<Vec<EntityDefinition>> {
    let name = |namespace: Namespace, relation: &str| {
        EntityName::new(namespace, relation).map_err(SemanticError::Catalog)
    };

    Ok(vec![EntityDefinition::derived(
        name(Namespace::Alerts, ALERT_FEED)?,
        "Threshold alerts on arrears, overtime, burnout, attendance, staffing and absence",
        vec![
            name(Namespace::Business, EMPLOYEE_SUMMARY)?,
            name(Namespace::Business, ATTENDANCE_DETAIL)?,
            name(Namespace::Business, CLINICAL_STAFF_SUMMARY)?,
            name(Namespace::Metrics, ATTENDANCE_METRICS)?,
            name(Namespace::Metrics, DEPARTMENT_STAFFING_RATIOS)?,
        ],
        alert_feed,
    )])
}

fn alert_feed(inputs: &Inputs, ctx: &mut BuildContext) -> Result<Table> {
    let config = &ctx.config.alerts;
    let as_of = ctx.as_of;
    let attendance = inputs.get(ATTENDANCE_DETAIL)?;

    let mut alerts = Vec::new();
    alerts.extend(rules::high_arrears(inputs.get(EMPLOYEE_SUMMARY)?, config));
    alerts.extend(rules::excessive_overtime(attendance, as_of, config)?);
    alerts.extend(rules::burnout_risk(inputs.get(CLINICAL_STAFF_SUMMARY)?));
    alerts.extend(rules::low_attendance(inputs.get(ATTENDANCE_METRICS)?, config)?);
    alerts.extend(rules::understaffed_unit(inputs.get(DEPARTMENT_STAFFING_RATIOS)?, config)?);
    alerts.extend(rules::frequent_absence(attendance, as_of, config)?);

    sort_alerts(&mut alerts);
    tracing::debug!(entity = %ctx.entity, alerts = alerts.len(), "Alert rules evaluated");

    rules::alerts_to_table(alerts, as_of)
}
