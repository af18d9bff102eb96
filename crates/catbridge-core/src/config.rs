use crate::app_config::{AppConfig, Environment, StoreBackend};
use crate::ConfigError;

const MIN_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;
const MIN_PROGRESS_BATCH: usize = 50;
const MAX_PROGRESS_BATCH: usize = 100;

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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let store_backend = parse_store_backend(&or_default("CATBRIDGE_STORE_BACKEND", "postgres"))
        .ok_or_else(|| {
            invalid(
                "CATBRIDGE_STORE_BACKEND",
                "expected \"postgres\" or \"memory\"".to_string(),
            )
        })?;

    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
        return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
    }

    let env = parse_environment(&or_default("CATBRIDGE_ENV", "development"));

    let bind_addr = or_default("CATBRIDGE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CATBRIDGE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CATBRIDGE_LOG_LEVEL", "info");
    let access_path = PathBuf::from(or_default("CATBRIDGE_ACCESS_PATH", "./config/access.yaml"));
    let api_keys = parse_list(&or_default("CATBRIDGE_API_KEYS", ""));

    let db_max_connections = parse_u32("CATBRIDGE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CATBRIDGE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CATBRIDGE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let magento_base_url = lookup("MAGENTO_BASE_URL")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty());
    let magento_access_token = lookup("MAGENTO_ACCESS_TOKEN")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let source_timeout_secs = parse_u64("CATBRIDGE_SOURCE_TIMEOUT_SECS", "30")?;
    let source_user_agent = or_default("CATBRIDGE_SOURCE_USER_AGENT", "catbridge/0.1 (catalog-sync)");
    let source_page_size =
        parse_u32("CATBRIDGE_SOURCE_PAGE_SIZE", "50")?.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    let source_max_retries = parse_u32("CATBRIDGE_SOURCE_MAX_RETRIES", "3")?;
    let source_backoff_base_ms = parse_u64("CATBRIDGE_SOURCE_BACKOFF_BASE_MS", "500")?;

    let progress_batch_size = parse_usize("CATBRIDGE_PROGRESS_BATCH_SIZE", "50")?
        .clamp(MIN_PROGRESS_BATCH, MAX_PROGRESS_BATCH);
    let slug_max_probes = parse_u32("CATBRIDGE_SLUG_MAX_PROBES", "100")?;
    if slug_max_probes == 0 {
        return Err(invalid(
            "CATBRIDGE_SLUG_MAX_PROBES",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        store_backend,
        database_url,
        env,
        bind_addr,
        log_level,
        access_path,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        magento_base_url,
        magento_access_token,
        source_timeout_secs,
        source_user_agent,
        source_page_size,
        source_max_retries,
        source_backoff_base_ms,
        progress_batch_size,
        slug_max_probes,
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

fn parse_store_backend(s: &str) -> Option<StoreBackend> {
    match s.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => Some(StoreBackend::Postgres),
        "memory" | "mem" => Some(StoreBackend::Memory),
        _ => None,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
