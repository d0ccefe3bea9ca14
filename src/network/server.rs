// src/network/server.rs
//! Accept loop. Each connection gets its own worker task; admission is
//! bounded by a semaphore so a connection flood queues in the accept loop
//! instead of spawning without limit.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::auth::CredentialSigner;
use super::error::{Result as SessionResult, SessionError};
use super::protocol::{serve_connection, KeySource, ServerContext};
use super::transport::{tcp, tls};
use crate::core::crypto::{encode_document, fingerprint, Bit, Lwe, PublicKey};
use crate::utils::config::{Config, KeyScope};
use crate::utils::error::{AppError, Result};
use crate::utils::metrics::{SessionMetrics, SessionOutcome};

/// What one server worker observed, published on the optional outcome channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: Uuid,
    pub peer: SocketAddr,
    pub outcome: SessionOutcome,
    pub bit: Option<Bit>,
}

pub struct LweServer {
    listen_address: String,
    ctx: Arc<ServerContext>,
    acceptor: TlsAcceptor,
    admission: Arc<Semaphore>,
    metrics: Arc<SessionMetrics>,
    reports: Option<mpsc::UnboundedSender<SessionReport>>,
}

impl LweServer {
    pub fn new(config: &Config) -> Result<Self> {
        let lwe = Lwe::new(config.params()?)?;

        let keys = match config.lattice.key_scope {
            KeyScope::Shared => {
                let pair = lwe.generate_keys()?;
                let encoded = encode_document(&pair.0)?;
                info!(
                    n = lwe.params().n,
                    q = lwe.params().q,
                    fingerprint = %fingerprint(&encoded),
                    "generated server key pair"
                );
                KeySource::Shared(Arc::new(pair))
            }
            KeyScope::PerSession => KeySource::PerSession,
        };

        let ctx = ServerContext {
            lwe,
            keys,
            signer: CredentialSigner::new(config.auth.secret.as_bytes()),
            limits: config.frame_limits(),
            credential_limits: config.credential_limits(),
            max_chunks: config.network.max_chunks,
        };

        Ok(Self {
            listen_address: config.network.listen_address.clone(),
            ctx: Arc::new(ctx),
            acceptor: tls::server_acceptor(&config.tls)?,
            admission: Arc::new(Semaphore::new(config.network.max_concurrent_sessions)),
            metrics: Arc::new(SessionMetrics::new()),
            reports: None,
        })
    }

    /// Publishes a [`SessionReport`] for every finished connection.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<SessionReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// The shared public key, if the server was configured with one.
    pub fn public_key(&self) -> Option<&PublicKey> {
        match &self.ctx.keys {
            KeySource::Shared(pair) => Some(&pair.0),
            KeySource::PerSession => None,
        }
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Binds the configured address and serves until the process ends.
    pub async fn run(&self) -> Result<()> {
        let listener = tcp::listen(&self.listen_address).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            let permit = Arc::clone(&self.admission)
                .acquire_owned()
                .await
                .map_err(|e| AppError::Network(e.to_string()))?;

            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "Accept error");
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!(%peer, error = %e, "failed to set TCP_NODELAY");
            }
            self.metrics.record_accepted();

            let worker = Worker {
                ctx: Arc::clone(&self.ctx),
                acceptor: self.acceptor.clone(),
                metrics: Arc::clone(&self.metrics),
                reports: self.reports.clone(),
            };
            let id = Uuid::new_v4();
            let span = info_span!("session", %id, %peer);

            tokio::spawn(
                async move {
                    let _permit = permit;
                    worker.handle(id, peer, stream).await;
                }
                .instrument(span),
            );
        }
    }
}

struct Worker {
    ctx: Arc<ServerContext>,
    acceptor: TlsAcceptor,
    metrics: Arc<SessionMetrics>,
    reports: Option<mpsc::UnboundedSender<SessionReport>>,
}

impl Worker {
    async fn handle(self, id: Uuid, peer: SocketAddr, stream: TcpStream) {
        let started = Instant::now();
        debug!("connection accepted");

        let result = self.secure_and_serve(stream).await;
        let (outcome, bit) = match result {
            Ok(bit) => (SessionOutcome::Decrypted, Some(bit)),
            Err(SessionError::Rejected(e)) => {
                warn!(error = %e, "credential rejected");
                (SessionOutcome::Rejected, None)
            }
            Err(e) => {
                error!(error = %e, "session failed");
                (SessionOutcome::Failed, None)
            }
        };

        self.metrics.record_outcome(outcome, started.elapsed());
        self.metrics.log_summary();

        if let Some(reports) = &self.reports {
            let _ = reports.send(SessionReport { id, peer, outcome, bit });
        }
    }

    async fn secure_and_serve(&self, stream: TcpStream) -> SessionResult<Bit> {
        let stream = tls::accept(&self.acceptor, stream).await?;
        debug!("secure channel established");
        serve_connection(stream, &self.ctx).await
    }
}
