use crate::app_config::{AppConfig, Environment};
use crate::geo::{DEFAULT_GEO_LIMIT, MAX_GEO_LIMIT};
use crate::search::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_limit = |var: &str, default: usize, max: usize| -> Result<usize, ConfigError> {
        let raw = or_default(var, &default.to_string());
        let value = raw
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 || value > max {
            return Err(invalid(var, format!("must be between 1 and {max}, got {value}")));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("ORGDIR_ENV", "development"))?;
    let log_level = or_default("ORGDIR_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ORGDIR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ORGDIR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ORGDIR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "ORGDIR_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds ORGDIR_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    let seed_data = parse_bool(&or_default("ORGDIR_SEED_DATA", "false"))
        .ok_or_else(|| invalid("ORGDIR_SEED_DATA", "expected true or false".to_string()))?;

    let search_limit = parse_limit("ORGDIR_SEARCH_LIMIT", DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT)?;
    let geo_limit = parse_limit("ORGDIR_GEO_LIMIT", DEFAULT_GEO_LIMIT, MAX_GEO_LIMIT)?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        seed_data,
        search_limit,
        geo_limit,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ORGDIR_ENV".to_string(),
            reason: format!("unknown environment {other:?}"),
        }),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
