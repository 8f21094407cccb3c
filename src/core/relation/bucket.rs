//! Calendar bucketing
//!
//! Every date falls in exactly one bucket per grain, so totals summed over
//! buckets reconcile with the unbucketed total. Weeks are ISO weeks starting
//! on Monday; months and years are calendar based.

use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeGrain {
    Week,
    Month,
    Year,
}

impl TimeGrain {
    /// First day of the bucket containing `date`
    pub fn start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeGrain::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            TimeGrain::Month => date.with_day(1).unwrap_or(date),
            TimeGrain::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Sortable bucket label: `2024-W23`, `2024-06`, `2024`
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            TimeGrain::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            TimeGrain::Month => date.format("%Y-%m").to_string(),
            TimeGrain::Year => date.year().to_string(),
        }
    }
}
