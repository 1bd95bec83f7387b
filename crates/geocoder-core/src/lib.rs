pub mod app_config;
pub mod config;
pub mod query;
pub mod types;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use query::{GeocodeQuery, QueryError, MAX_ADDRESS_CHARS};
pub use types::{AddressCandidate, EngineRecord, GeocodeResult, QueryEcho};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
