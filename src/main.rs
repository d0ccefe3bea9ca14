use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lwe_secure_link::{utils::config::Config, Application, Bit, Mode};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Sends one LWE-encrypted bit over a mutually authenticated TLS channel
#[derive(Parser, Debug)]
#[command(name = "lwe-secure-link")]
#[command(version)]
struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accept connections and decrypt one bit per session
    Server,
    /// Connect to the server and send one encrypted bit
    Client {
        /// Plaintext bit; defaults to client.message from the configuration
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
        message: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.node.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting lwe-secure-link v{}", env!("CARGO_PKG_VERSION"));

    let mode = match cli.mode {
        Command::Server => Mode::Server,
        Command::Client { message } => Mode::Client {
            message: message.map(Bit::try_from).transpose()?,
        },
    };

    let app = Application::new(config);

    tokio::select! {
        result = app.run(mode) => {
            if let Err(e) = &result {
                error!("Run failed: {}", e);
            }
            result?;
        }
        signal = signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
