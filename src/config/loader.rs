//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{SemanticConfig, SourceKind, SourceMode};
use super::secret::secret_string;
use crate::domain::errors::SemanticError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into SemanticConfig
/// 4. Applies environment variable overrides (HRMS_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use hrms_semantic::config::loader::load_config;
///
/// let config = load_config("hrms.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SemanticConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SemanticError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SemanticError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration text
pub fn parse_config(contents: &str) -> Result<SemanticConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: SemanticConfig = toml::from_str(&contents)
        .map_err(|e| SemanticError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SemanticError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SemanticError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SemanticError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using HRMS_* prefix
///
/// Environment variables follow the pattern: HRMS_<SECTION>_<KEY>
/// For example: HRMS_SOURCE_MODE, HRMS_PIPELINE_AS_OF
fn apply_env_overrides(config: &mut SemanticConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("HRMS_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Source overrides
    if let Ok(val) = std::env::var("HRMS_SOURCE_MODE") {
        config.source.mode = match val.to_lowercase().as_str() {
            "federated" => SourceMode::Federated,
            "import" => SourceMode::Import,
            other => {
                return Err(SemanticError::Configuration(format!(
                    "Invalid HRMS_SOURCE_MODE '{}'. Must be 'federated' or 'import'",
                    other
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("HRMS_SOURCE_KIND") {
        config.source.kind = match val.to_lowercase().as_str() {
            "postgresql" => SourceKind::PostgreSQL,
            "json" => SourceKind::Json,
            other => {
                return Err(SemanticError::Configuration(format!(
                    "Invalid HRMS_SOURCE_KIND '{}'. Must be 'postgresql' or 'json'",
                    other
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("HRMS_SOURCE_JSON_PATH") {
        config.source.json_path = val;
    }
    if let Some(ref mut pg) = config.source.postgresql {
        if let Ok(val) = std::env::var("HRMS_SOURCE_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("HRMS_SOURCE_POSTGRESQL_SCHEMA") {
            pg.schema = val;
        }
        if let Ok(val) = std::env::var("HRMS_SOURCE_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg.max_connections = max;
            }
        }
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("HRMS_PIPELINE_DATA_DIR") {
        config.pipeline.data_dir = val;
    }
    if let Ok(val) = std::env::var("HRMS_PIPELINE_AS_OF") {
        let date = val.parse().map_err(|e| {
            SemanticError::Configuration(format!("Invalid HRMS_PIPELINE_AS_OF '{}': {}", val, e))
        })?;
        config.pipeline.as_of = Some(date);
    }
    if let Ok(val) = std::env::var("HRMS_PIPELINE_ACTIVITY_LOG_DAYS") {
        if let Ok(days) = val.parse() {
            config.pipeline.activity_log_days = days;
        }
    }
    if let Ok(val) = std::env::var("HRMS_PIPELINE_MAX_PARALLEL") {
        if let Ok(parallel) = val.parse() {
            config.pipeline.max_parallel = parallel;
        }
    }

    // Cache overrides
    if let Ok(val) = std::env::var("HRMS_CACHE_ENABLED") {
        config.cache.enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("HRMS_CACHE_DIRECTORY") {
        config.cache.directory = Some(val);
    }
    if let Ok(val) = std::env::var("HRMS_CACHE_MAX_AGE_MINUTES") {
        if let Ok(minutes) = val.parse() {
            config.cache.max_age_minutes = Some(minutes);
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("HRMS_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("HRMS_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
