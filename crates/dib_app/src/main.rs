mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dib_core::DibConfig;
use dib_core::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about = "Deploy and reconcile the DI bridge contracts")]
struct Cli {
    /// Operator settings file
    #[arg(long, global = true, default_value = "dib.toml", env = "DIB_CONFIG")]
    config: PathBuf,

    /// Address file directory [default: from config]
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// RPC endpoint for the selected network, overriding its configured key
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the network registry and per-network token resolution
    Networks,

    /// Deploy and wire the contract set on a network
    Deploy {
        #[arg(long)]
        network: String,
        /// Redeploy roles already in the address file
        #[arg(long)]
        fresh: bool,
    },

    /// Register the other networks' chains on this network's gateway
    Link {
        #[arg(long)]
        network: String,
    },

    /// Sync chain and token registrations into the bridge hub
    Reconcile {
        #[arg(long)]
        network: String,
    },

    /// Read back a deployed gateway
    Verify {
        #[arg(long)]
        network: String,
    },

    /// Summarize the address files
    Status,

    /// Latest block gas limit of every enabled network
    GasLimits,

    /// Read back on-chain registrations
    Inspect {
        #[command(subcommand)]
        target: InspectTarget,
    },
}

#[derive(Subcommand)]
enum InspectTarget {
    /// Supported tokens of a network's token registry
    Tokens {
        #[arg(long)]
        network: String,
    },
    /// Chains registered on the bridge hub
    Chains,
}

/// Only a missing `.env` is tolerated; a malformed one is an error.
fn tolerate_missing_env<T>(result: Result<T, dotenvy::Error>) -> Result<(), dotenvy::Error> {
    match result {
        Ok(_) => Ok(()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = tolerate_missing_env(dotenvy::dotenv()) {
        eprintln!("error: reading .env: {e}");
        return ExitCode::FAILURE;
    }
    let cli = Cli::parse();

    let mut config = match DibConfig::load_from_path(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.store_dir.clone() {
        config.store_dir = dir;
    }

    let _log_guard = match config
        .logs_dir()
        .and_then(|dir| logging::init_logging(&dir, &config.log_level))
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    info!("Starting dib v{}", env!("CARGO_PKG_VERSION"));

    match commands::run(cli.command, config, cli.rpc_url).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
