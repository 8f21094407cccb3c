//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "hrms.toml")]
    pub output: String,

    /// Include every option with its default and a comment
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing HRMS semantic layer configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your source tables", self.output);
                println!("  2. For PostgreSQL sources set HRMS_PG_CONNECTION in .env");
                println!("  3. Validate configuration: hrms-semantic validate-config");
                println!("  4. Copy source tables (import mode): hrms-semantic import");
                println!("  5. Build snapshots: hrms-semantic rebuild");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# HRMS Semantic Layer Configuration

[application]
log_level = "info"

[source]
mode = "import"   # import | federated
kind = "json"     # json | postgresql
json_path = "./source"

[source.tables]
employees = "Employee_Master"
payroll = "CRMC_PayrollFile"
attendance = ["Attendance_2024H1", "Attendance_2024H2"]
activity_log = "Activity_Log"

[pipeline]
data_dir = "./data"
activity_log_days = 30

[cache]
enabled = true

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with every option documented
    fn generate_config_with_examples() -> String {
        r#"# HRMS Semantic Layer Configuration
#
# Raw HR tables flow through four layers:
#   staging  - typed, cleaned copies of the source tables
#   business - joined views (employee summary, payroll, attendance, clinical staff)
#   metrics  - aggregated KPIs
#   alerts   - threshold alerts over business and metrics
#
# Any entity can be materialized as a snapshot; reads fall back to live
# evaluation when no snapshot exists.
#
# Every value may reference environment variables as ${VAR_NAME}, and any
# key can be overridden with HRMS_<SECTION>_<KEY> (e.g. HRMS_SOURCE_MODE).

[application]
# trace | debug | info | warn | error
log_level = "info"

[source]
# import: `import` copies source tables to <data_dir>/raw and staging reads them
# federated: staging queries the source on every live evaluation
mode = "import"

# json: directory of <table>.json extracts
# postgresql: remote database (requires [source.postgresql])
kind = "json"
json_path = "./source"

[source.tables]
employees = "Employee_Master"
payroll = "CRMC_PayrollFile"
# Time-boxed attendance batches, unioned in staging
attendance = ["Attendance_2024H1", "Attendance_2024H2"]
activity_log = "Activity_Log"

# [source.postgresql]
# connection_string = "${HRMS_PG_CONNECTION}"
# schema = "public"
# max_connections = 5
# connection_timeout_seconds = 30
# statement_timeout_seconds = 300

[pipeline]
data_dir = "./data"
# Fixed run date (YYYY-MM-DD); defaults to the current UTC date
# as_of = "2024-06-30"
# Activity log rows older than this many days are dropped
activity_log_days = 30
# Entities evaluated concurrently within one dependency level
max_parallel = 4
# Shifts at or above this length count as extended
extended_shift_hours = 12.0
# Hours used to derive hourly rates from annual salaries
annual_hours = 2080.0
# Staff per department and day below which a day is understaffed
min_staff_per_shift = 3

[alerts]
# Look-back window for overtime and absence alerts
window_days = 30
low_attendance_high_below = 75.0
low_attendance_medium_below = 85.0
understaffed_high_pct = 50.0
understaffed_medium_pct = 25.0
frequent_absence_min = 3

[alerts.high_arrears]
high = 500.0
medium = 250.0
low = 100.0

[alerts.excessive_overtime]
high = 60.0
medium = 40.0
low = 20.0

[cache]
enabled = true
# Defaults to <data_dir>/cache
# directory = "./data/cache"
# Entities snapshotted by `rebuild`; empty means every business,
# metrics and alerts entity
materialize = []
# Snapshots older than this are reported as expired
# max_age_minutes = 1440

[logging]
local_enabled = true
local_path = "./logs"
# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "hrms.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "hrms.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generated_configs_parse() {
        let minimal = parse_config(&InitArgs::generate_minimal_config()).unwrap();
        assert_eq!(minimal.source.tables.attendance.len(), 2);

        let full = parse_config(&InitArgs::generate_config_with_examples()).unwrap();
        assert_eq!(full.pipeline.min_staff_per_shift, 3);
        assert_eq!(full.alerts.high_arrears.high, 500.0);
        assert!(full.cache.materialize.is_empty());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hrms.toml");
        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            with_examples: true,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 0);
        assert_eq!(args.execute().await.unwrap(), 2);
    }
}
