use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::{IpAddr, SocketAddr};
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u16 = |var: &str, default: &str| -> Result<u16, ConfigError> {
        or_default(var, default)
            .parse::<u16>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_nonzero_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        match or_default(var, default).parse::<u64>() {
            Ok(0) => Err(invalid(var, "must be greater than zero".to_string())),
            Ok(v) => Ok(v),
            Err(e) => Err(invalid(var, e.to_string())),
        }
    };

    let parse_nonzero_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        match or_default(var, default).parse::<usize>() {
            Ok(0) => Err(invalid(var, "must be greater than zero".to_string())),
            Ok(v) => Ok(v),
            Err(e) => Err(invalid(var, e.to_string())),
        }
    };

    let host = or_default("HOST", "0.0.0.0")
        .parse::<IpAddr>()
        .map_err(|e| invalid("HOST", e.to_string()))?;
    let port = parse_u16("PORT", "3000")?;
    let bind_addr = SocketAddr::new(host, port);

    let log_level = or_default("LOG_LEVEL", "info");
    let abrg_bin = PathBuf::from(or_default("ABRG_BIN", "abrg"));
    let abrg_data_dir = PathBuf::from(or_default("ABR_GEOCODER_DIR", "/data/abr-geocoder"));
    let engine_timeout_secs = parse_nonzero_u64("ABRG_TIMEOUT_SECS", "30")?;
    let max_concurrent_engines = parse_nonzero_usize("ABRG_MAX_CONCURRENT", "8")?;

    Ok(AppConfig {
        bind_addr,
        log_level,
        abrg_bin,
        abrg_data_dir,
        engine_timeout_secs,
        max_concurrent_engines,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
