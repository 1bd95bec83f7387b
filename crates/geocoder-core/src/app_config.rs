use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide settings, read once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Executable of the resolution engine. A bare name is resolved via `PATH`.
    pub abrg_bin: PathBuf,
    /// Data directory handed to the engine with `-d`.
    pub abrg_data_dir: PathBuf,
    pub engine_timeout_secs: u64,
    pub max_concurrent_engines: usize,
}

impl AppConfig {
    #[must_use]
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }
}
