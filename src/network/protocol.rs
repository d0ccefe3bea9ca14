// src/network/protocol.rs
//! The key-exchange / single-bit session run over an established secure channel.
//!
//! Server: authenticate → send public key → receive ciphertext → decrypt.
//! Client: send credential → receive public key → encrypt → send ciphertext.
//! Exactly one document travels in each direction per connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use super::auth::{CredentialDecoder, CredentialSigner};
use super::error::{Result, SessionError};
use super::framer::{FrameLimits, Framer, ReadBudget};
use crate::core::crypto::{
    encode_document, fingerprint, Bit, Ciphertext, Lwe, PublicKey, SecretKey,
};

/// Server-side protocol states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Listening,
    AwaitingAuth,
    Authenticated,
    KeysSent,
    AwaitingCiphertext,
    Decrypted,
    Rejected,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Decrypted | SessionState::Rejected)
    }
}

/// Where a server session gets its key pair from.
#[derive(Clone)]
pub enum KeySource {
    /// One pair generated at startup and shared read-only by every session.
    Shared(Arc<(PublicKey, SecretKey)>),
    /// A fresh pair generated inside each session.
    PerSession,
}

/// Everything a server session needs, shared across workers.
pub struct ServerContext {
    pub lwe: Lwe,
    pub keys: KeySource,
    pub signer: CredentialSigner,
    pub limits: FrameLimits,
    pub credential_limits: FrameLimits,
    pub max_chunks: usize,
}

impl ServerContext {
    fn key_pair(&self) -> Result<Arc<(PublicKey, SecretKey)>> {
        match &self.keys {
            KeySource::Shared(pair) => Ok(Arc::clone(pair)),
            KeySource::PerSession => Ok(Arc::new(self.lwe.generate_keys()?)),
        }
    }
}

/// One server-side protocol run over a single connection.
pub struct ServerSession<S> {
    framer: Framer<S>,
    state: SessionState,
}

impl<S> ServerSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, ctx: &ServerContext) -> Self {
        Self {
            framer: Framer::new(stream, ctx.credential_limits),
            state: SessionState::Listening,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the session to a terminal state and closes the channel on every path.
    pub async fn run(&mut self, ctx: &ServerContext) -> Result<Bit> {
        let result = self.exchange(ctx).await;
        match &result {
            Ok(_) => self.state = SessionState::Decrypted,
            Err(e) => {
                warn!(error = %e, step = ?self.state, "session rejected");
                self.state = SessionState::Rejected;
            }
        }
        if let Err(e) = self.framer.shutdown().await {
            debug!(error = %e, "channel shutdown failed");
        }
        result
    }

    async fn exchange(&mut self, ctx: &ServerContext) -> Result<Bit> {
        self.state = SessionState::AwaitingAuth;
        let token = self
            .framer
            .read_frame(&mut CredentialDecoder::new(), ReadBudget::Unbounded)
            .await?;
        let claims = ctx.signer.verify(&token)?;
        self.state = SessionState::Authenticated;
        info!(user = %claims.user, "peer authenticated");

        let keys = ctx.key_pair()?;
        let (public_key, secret_key) = (&keys.0, &keys.1);
        let encoded = encode_document(public_key)?;
        self.framer.write_frame(&encoded).await?;
        self.state = SessionState::KeysSent;
        info!(size = encoded.len(), fingerprint = %fingerprint(&encoded), "sent public key");

        self.state = SessionState::AwaitingCiphertext;
        self.framer.set_limits(ctx.limits);
        let q = ctx.lwe.params().q;
        let (ciphertext, size): (Ciphertext, usize) = self
            .framer
            .read_value(q, ReadBudget::Bounded(ctx.max_chunks))
            .await?;
        debug!(size, "received ciphertext");

        if ciphertext.dimension() != secret_key.dimension() {
            return Err(SessionError::DimensionMismatch {
                expected: secret_key.dimension(),
                actual: ciphertext.dimension(),
            });
        }

        let bit = ctx.lwe.decrypt(secret_key, &ciphertext);
        info!(%bit, "decrypted bit");
        Ok(bit)
    }
}

/// Serves one already-secured connection.
pub async fn serve_connection<S>(stream: S, ctx: &ServerContext) -> Result<Bit>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ServerSession::new(stream, ctx).run(ctx).await
}

/// Client-side settings for one run.
pub struct ClientSession<'a> {
    pub lwe: &'a Lwe,
    pub signer: &'a CredentialSigner,
    pub user: &'a str,
    pub limits: FrameLimits,
    pub max_chunks: usize,
    pub timeout: Option<Duration>,
}

/// What the client observed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReport {
    pub message: Bit,
    pub public_key_size: usize,
    pub public_key_fingerprint: String,
    pub ciphertext_size: usize,
}

impl ClientSession<'_> {
    /// Runs the client side over an already-secured channel. Any failure
    /// aborts the run; nothing is retried.
    pub async fn run<S>(&self, stream: S, message: Bit) -> Result<ClientReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framer = Framer::new(stream, self.limits);
        if let Some(limit) = self.timeout {
            framer = framer.with_timeout(limit);
        }

        let result = self.exchange(&mut framer, message).await;
        if let Err(e) = framer.shutdown().await {
            debug!(error = %e, "channel shutdown failed");
        }
        if let Err(e) = &result {
            warn!(error = %e, "client run aborted");
        }
        result
    }

    async fn exchange<S>(&self, framer: &mut Framer<S>, message: Bit) -> Result<ClientReport>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let token = self.signer.issue(self.user)?;
        framer.write_frame(token.as_bytes()).await?;
        debug!(size = token.len(), "sent credential");

        let q = self.lwe.params().q;
        let (public_key, public_key_size): (PublicKey, usize) =
            framer.read_value(q, ReadBudget::Bounded(self.max_chunks)).await?;
        let expected = self.lwe.params().n;
        if public_key.dimension() != expected {
            return Err(SessionError::DimensionMismatch {
                expected,
                actual: public_key.dimension(),
            });
        }
        let public_key_fingerprint = fingerprint(&encode_document(&public_key)?);
        info!(size = public_key_size, fingerprint = %public_key_fingerprint, "received public key");

        let ciphertext = self.lwe.encrypt(&public_key, message)?;
        let encoded = encode_document(&ciphertext)?;
        framer.write_frame(&encoded).await?;
        info!(%message, size = encoded.len(), "sent encrypted message");

        Ok(ClientReport {
            message,
            public_key_size,
            public_key_fingerprint,
            ciphertext_size: encoded.len(),
        })
    }
}
