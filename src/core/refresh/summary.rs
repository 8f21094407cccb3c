//! Rebuild summary and reporting

use crate::core::catalog::Diagnostics;
use crate::domain::EntityName;
use chrono::NaiveDate;
use std::time::Duration;

/// One entity that failed during a rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub entity: EntityName,
    pub message: String,
}

/// Outcome of a rebuild run
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    /// Run date every entity was evaluated for
    pub as_of: NaiveDate,

    /// Entities evaluated successfully
    pub built: Vec<EntityName>,

    /// Entities whose snapshot was replaced
    pub materialized: Vec<EntityName>,

    /// Entities whose evaluation or snapshot write failed
    pub failures: Vec<RefreshFailure>,

    /// Entities not evaluated because an upstream entity failed
    pub skipped: Vec<EntityName>,

    /// Rows produced across all built entities
    pub total_rows: usize,

    /// Rejected rows, cast failures and join fan-outs across the run
    pub diagnostics: Diagnostics,

    pub duration: Duration,
}

impl RefreshSummary {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            built: Vec::new(),
            materialized: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            total_rows: 0,
            diagnostics: Diagnostics::default(),
            duration: Duration::from_secs(0),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_failure(&mut self, entity: EntityName, message: impl Into<String>) {
        self.failures.push(RefreshFailure {
            entity,
            message: message.into(),
        });
    }

    /// True when no entity failed or was skipped
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            as_of = %self.as_of,
            built = self.built.len(),
            materialized = self.materialized.len(),
            failed = self.failures.len(),
            skipped = self.skipped.len(),
            total_rows = self.total_rows,
            rejected_rows = self.diagnostics.rejected_rows,
            cast_failures = self.diagnostics.cast_failures,
            duration_ms = self.duration.as_millis() as u64,
            "Rebuild completed"
        );

        for fan_out in &self.diagnostics.fan_outs {
            tracing::warn!(
                entity = %fan_out.entity,
                join = %fan_out.join,
                extra_rows = fan_out.extra_rows,
                "Join fan-out"
            );
        }

        if !self.failures.is_empty() {
            tracing::warn!(
                failure_count = self.failures.len(),
                "Rebuild completed with failures"
            );
            for failure in &self.failures {
                tracing::warn!(entity = %failure.entity, message = %failure.message, "Entity failed");
            }
        }
        for entity in &self.skipped {
            tracing::warn!(entity = %entity, "Entity skipped after upstream failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_success_requires_no_failures_or_skips() {
        let mut summary = RefreshSummary::new(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert!(summary.is_successful());

        summary.skipped.push("metrics.headcount_metrics".parse().unwrap());
        assert!(!summary.is_successful());

        summary.skipped.clear();
        summary.add_failure("business.employee_summary".parse().unwrap(), "boom");
        assert!(!summary.is_successful());
        assert_eq!(summary.failures[0].message, "boom");
    }
}
