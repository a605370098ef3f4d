use crate::app_config::{AppConfig, Environment};
use crate::error::ConfigError;

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

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_opt_i64 = |var: &str| -> Result<Option<i64>, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                }),
            Err(_) => Ok(None),
        }
    };

    let uri = require("NORTHSTAR_URI")?;
    let username = require("NORTHSTAR_USERNAME")?;
    let password = require("NORTHSTAR_PASSWORD")?;

    let env = parse_environment(&or_default("STARLIFT_ENV", "development"));
    let log_level = or_default("STARLIFT_LOG_LEVEL", "info");

    let default_city = lookup("STARLIFT_DEFAULT_CITY").ok();
    let default_county = lookup("STARLIFT_DEFAULT_COUNTY").ok();

    let request_timeout_secs = parse_u64("STARLIFT_REQUEST_TIMEOUT_SECS", "30")?;
    let concurrency = parse_usize("STARLIFT_CONCURRENCY", "10")?;

    let log_dir = PathBuf::from(or_default("STARLIFT_LOG_DIR", "./log_output"));
    let cache_path = PathBuf::from(or_default(
        "STARLIFT_CACHE_PATH",
        "./.starlift/address_cache.json",
    ));
    let cache_ttl_days = parse_i64("STARLIFT_CACHE_TTL_DAYS", "90")?;

    let debit_adjustment_id = parse_opt_i64("STARLIFT_DEBIT_ADJUSTMENT_ID")?;
    let credit_adjustment_id = parse_opt_i64("STARLIFT_CREDIT_ADJUSTMENT_ID")?;

    Ok(AppConfig {
        uri,
        username,
        password,
        env,
        log_level,
        default_city,
        default_county,
        request_timeout_secs,
        concurrency,
        log_dir,
        cache_path,
        cache_ttl_days,
        debit_adjustment_id,
        credit_adjustment_id,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
