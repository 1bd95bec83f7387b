use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use geocoder_core::{AppConfig, GeocodeQuery};
use geocoder_engine::{AbrgInvoker, EngineSettings};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "geocoder-cli")]
#[command(about = "Run abrg lookups through the gateway's invoker without the HTTP layer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Geocode one address and print the same JSON envelope as `POST /geocode`.
    Lookup {
        address: String,
        /// Override `ABRG_TIMEOUT_SECS`.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Override `ABR_GEOCODER_DIR`.
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Override `ABRG_BIN`.
        #[arg(long)]
        bin: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = geocoder_core::load_app_config()?;
    // Logs go to stderr so stdout stays machine-readable.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Lookup {
            address,
            timeout_secs,
            data_dir,
            bin,
        } => {
            let settings = lookup_settings(&config, timeout_secs, data_dir, bin);
            Ok(ExitCode::from(lookup(settings, &address).await))
        }
        Commands::Config => {
            println!("{config:#?}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn lookup_settings(
    config: &AppConfig,
    timeout_secs: Option<u64>,
    data_dir: Option<PathBuf>,
    bin: Option<PathBuf>,
) -> EngineSettings {
    let mut settings = EngineSettings::from_app_config(config);
    if let Some(secs) = timeout_secs.filter(|s| *s > 0) {
        settings.timeout = Duration::from_secs(secs);
    }
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    if let Some(bin) = bin {
        settings.program = bin;
    }
    settings.max_concurrent = 1;
    settings
}

/// Runs one lookup, prints its envelope, and returns the process exit code.
async fn lookup(settings: EngineSettings, address: &str) -> u8 {
    let query = match GeocodeQuery::parse(address) {
        Ok(query) => query,
        Err(err) => {
            println!("{}", json!({ "success": false, "error": err.to_string() }));
            return 2;
        }
    };

    let invoker = AbrgInvoker::new(settings);
    match geocoder_engine::geocode(&invoker, &query).await {
        Ok(result) => {
            println!("{}", json!({ "success": true, "result": result }));
            0
        }
        Err(err) => {
            tracing::error!(kind = %err.kind(), error = %err, "lookup failed");
            println!(
                "{}",
                json!({
                    "success": false,
                    "error": "Geocoding failed",
                    "message": err.diagnostic(),
                })
            );
            1
        }
    }
}
