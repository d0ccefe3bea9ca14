pub mod core;
pub mod network;
pub mod utils;

use std::sync::Arc;
use tracing::info;

pub use crate::core::crypto::{Bit, Ciphertext, Lwe, LweParams, PublicKey, SecretKey};
pub use crate::network::{run_client, ClientReport, LweServer};
pub use crate::utils::{config::Config, error::{AppError, Result}};

/// Which side of the link this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Server,
    /// `message` overrides `client.message` from the configuration.
    Client { message: Option<Bit> },
}

pub struct Application {
    config: Arc<Config>,
}

impl Application {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Server mode runs until the process is terminated; client mode returns after one session.
    pub async fn run(&self, mode: Mode) -> Result<()> {
        match mode {
            Mode::Server => {
                info!("Initializing server...");
                let server = LweServer::new(&self.config)?;
                server.run().await
            }
            Mode::Client { message } => {
                let message = match message {
                    Some(bit) => bit,
                    None => self.config.message()?,
                };
                info!(server = %self.config.network.server_address, "Starting client run...");
                let report = run_client(&self.config, message).await?;
                info!(
                    message = %report.message,
                    public_key_bytes = report.public_key_size,
                    ciphertext_bytes = report.ciphertext_size,
                    fingerprint = %report.public_key_fingerprint,
                    "Client run complete"
                );
                Ok(())
            }
        }
    }
}
