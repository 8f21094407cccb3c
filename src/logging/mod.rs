//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs with rotation
//! - Configurable log levels
//! - Entity build macros with consistent field names
//!
//! # Example
//!
//! ```no_run
//! use hrms_semantic::logging::init_logging;
//! use hrms_semantic::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an entity build
///
/// # Example
///
/// ```no_run
/// use hrms_semantic::log_build_start;
/// use hrms_semantic::domain::EntityName;
///
/// let entity: EntityName = "business.employee_summary".parse().unwrap();
/// log_build_start!(&entity);
/// ```
#[macro_export]
macro_rules! log_build_start {
    ($entity:expr) => {
        tracing::debug!(entity = %$entity, "Building entity");
    };
}

/// Log the completion of an entity build
///
/// # Example
///
/// ```no_run
/// use hrms_semantic::log_build_complete;
/// use std::time::Duration;
///
/// log_build_complete!("metrics.headcount_metrics", 42, Duration::from_millis(15));
/// ```
#[macro_export]
macro_rules! log_build_complete {
    ($entity:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            entity = %$entity,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Entity built"
        );
    };
}

/// Log rows rejected by strict casts or missing keys
///
/// # Example
///
/// ```no_run
/// use hrms_semantic::log_rows_rejected;
///
/// log_rows_rejected!("staging.stg_payroll", 3, "null or invalid emp_id");
/// ```
#[macro_export]
macro_rules! log_rows_rejected {
    ($entity:expr, $count:expr, $reason:expr) => {
        tracing::warn!(
            entity = %$entity,
            rejected = $count,
            reason = $reason,
            "Rows rejected"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use hrms_semantic::log_error_with_context;
/// use hrms_semantic::domain::SemanticError;
///
/// let error = SemanticError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
