// src/network/client.rs
use tracing::info;

use super::auth::CredentialSigner;
use super::protocol::{ClientReport, ClientSession};
use super::transport::{tcp, tls};
use crate::core::crypto::{Bit, Lwe};
use crate::utils::config::Config;
use crate::utils::error::Result;

/// Connects to the configured server, runs one session and sends `message`.
///
/// Connect, handshake and every channel read or write share the configured
/// client timeout. Nothing is retried.
pub async fn run_client(config: &Config, message: Bit) -> Result<ClientReport> {
    let lwe = Lwe::new(config.params()?)?;
    let signer = CredentialSigner::new(config.auth.secret.as_bytes());
    let connector = tls::client_connector(&config.tls)?;
    let name = tls::server_name(&config.tls.server_name)?;
    let timeout = config.get_client_timeout();
    let address = config.network.server_address.as_str();

    let stream = tcp::connect(address, Some(timeout)).await?;
    let stream = tls::connect(&connector, name, stream, Some(timeout)).await?;
    info!(server = %address, "secure channel established");

    let session = ClientSession {
        lwe: &lwe,
        signer: &signer,
        user: &config.auth.user,
        limits: config.frame_limits(),
        max_chunks: config.network.max_chunks,
        timeout: Some(timeout),
    };
    Ok(session.run(stream, message).await?)
}
