// src/utils/config.rs
use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;

use crate::core::crypto::{Bit, LweParams};
use crate::network::framer::FrameLimits;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub lattice: LatticeConfig,
    pub network: NetworkConfig,
    pub tls: TlsConfig,
    pub auth: AuthConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    /// One key pair for the lifetime of the server.
    Shared,
    PerSession,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatticeConfig {
    pub n: usize,
    pub q: u64,
    pub stddev: f64,
    pub key_scope: KeyScope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub listen_address: String,
    pub server_address: String,
    pub max_message_size: usize,
    pub chunk_size: usize,
    /// Upper bound on the bearer credential, read before the peer is authenticated.
    pub max_credential_size: usize,
    pub credential_chunk_size: usize,
    pub max_chunks: usize,
    pub client_timeout_secs: u64,
    pub max_concurrent_sessions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
    pub peer_cert_path: String,
    pub server_name: String,
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret: String,
    pub user: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub message: u8,
}

impl Config {
    /// Defaults, then `config/default` and `config/local` when present, then the optional
    /// `path`, then `LWE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            // e.g. LWE_NETWORK__SERVER_ADDRESS=host:port
            .add_source(
                Environment::with_prefix("LWE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    /// Defaults overlaid with a single file; the environment is not consulted.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = Self::defaults()?.add_source(File::from(path)).build()?;
        Self::finish(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(ConfigLib::builder()
            .set_default("node.log_level", "info")?
            .set_default("lattice.n", 128)?
            .set_default("lattice.q", 3329)?
            .set_default("lattice.stddev", 3.19)?
            .set_default("lattice.key_scope", "shared")?
            .set_default("network.listen_address", "localhost:65432")?
            .set_default("network.server_address", "localhost:65432")?
            .set_default("network.max_message_size", 10_485_760)? // 10MB
            .set_default("network.chunk_size", 131_072)?
            .set_default("network.max_credential_size", 8192)?
            .set_default("network.credential_chunk_size", 1024)?
            .set_default("network.max_chunks", 20)?
            .set_default("network.client_timeout_secs", 5)?
            .set_default("network.max_concurrent_sessions", 64)?
            .set_default("tls.cert_path", "server.crt")?
            .set_default("tls.key_path", "server.key")?
            .set_default("tls.peer_cert_path", "client.crt")?
            .set_default("tls.server_name", "localhost")?
            .set_default("auth.user", "client")?
            .set_default("client.message", 1)?)
    }

    fn finish(config: ConfigLib) -> Result<Self> {
        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.is_empty() {
            return Err(AppError::Config(
                "auth.secret must be set (e.g. LWE_AUTH__SECRET)".into(),
            ));
        }
        if self.auth.user.is_empty() {
            return Err(AppError::Config("auth.user must not be empty".into()));
        }

        self.params()?;

        let network = &self.network;
        if network.max_chunks == 0 {
            return Err(AppError::Config("max_chunks must be greater than 0".into()));
        }
        if network.chunk_size == 0 || network.credential_chunk_size == 0 {
            return Err(AppError::Config("chunk sizes must be greater than 0".into()));
        }
        if network.chunk_size > network.max_message_size {
            return Err(AppError::Config(format!(
                "chunk_size {} exceeds max_message_size {}",
                network.chunk_size, network.max_message_size
            )));
        }
        if network.credential_chunk_size > network.max_credential_size {
            return Err(AppError::Config(format!(
                "credential_chunk_size {} exceeds max_credential_size {}",
                network.credential_chunk_size, network.max_credential_size
            )));
        }
        if network.max_concurrent_sessions == 0 {
            return Err(AppError::Config(
                "max_concurrent_sessions must be greater than 0".into(),
            ));
        }

        self.message()?;
        Ok(())
    }

    pub fn params(&self) -> Result<LweParams> {
        Ok(LweParams::new(self.lattice.n, self.lattice.q, self.lattice.stddev)?)
    }

    pub fn message(&self) -> Result<Bit> {
        Bit::try_from(self.client.message)
            .map_err(|_| AppError::Config(format!("client.message must be 0 or 1, got {}", self.client.message)))
    }

    pub fn frame_limits(&self) -> FrameLimits {
        FrameLimits {
            max_message_size: self.network.max_message_size,
            chunk_size: self.network.chunk_size,
        }
    }

    pub fn credential_limits(&self) -> FrameLimits {
        FrameLimits {
            max_message_size: self.network.max_credential_size,
            chunk_size: self.network.credential_chunk_size,
        }
    }

    pub fn get_client_timeout(&self) -> Duration {
        Duration::from_secs(self.network.client_timeout_secs)
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}
