// src/network/transport/tls.rs
//! Mutually authenticated TLS for both peers.
//!
//! Each side presents its own certificate chain and trusts exactly the
//! certificates found in its configured peer file (the peer's self-issued
//! certificate or the issuer that signed it). No system roots are loaded.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use rustls::crypto::{ring as ring_provider, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tokio::net::TcpStream;
use tokio_rustls::{client, server, TlsAcceptor, TlsConnector};

use crate::network::error::TlsError;
use crate::utils::config::TlsConfig;

pub type Result<T> = std::result::Result<T, TlsError>;

fn provider() -> Arc<CryptoProvider> {
    Arc::new(ring_provider::default_provider())
}

pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| pem_error(path, e))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| pem_error(path, e))?;
    if certs.is_empty() {
        return Err(TlsError::Pem {
            path: path.to_string(),
            reason: "no certificates found".into(),
        });
    }
    Ok(certs)
}

pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| pem_error(path, e))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| pem_error(path, e))?
        .ok_or_else(|| TlsError::Pem {
            path: path.to_string(),
            reason: "no private key found".into(),
        })
}

fn load_roots(path: &str) -> Result<Arc<RootCertStore>> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots
            .add(cert)
            .map_err(|e| TlsError::Config(format!("untrusted peer certificate in {}: {}", path, e)))?;
    }
    Ok(Arc::new(roots))
}

fn pem_error(path: &str, e: impl std::fmt::Display) -> TlsError {
    TlsError::Pem {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

/// Server side: requires every client to present a certificate chaining to the peer file.
pub fn server_acceptor(config: &TlsConfig) -> Result<TlsAcceptor> {
    let provider = provider();
    let verifier = WebPkiClientVerifier::builder_with_provider(load_roots(&config.peer_cert_path)?, provider.clone())
        .build()
        .map_err(|e| TlsError::Config(e.to_string()))?;

    let server_config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(load_certs(&config.cert_path)?, load_private_key(&config.key_path)?)
        .map_err(|e| TlsError::Config(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// Client side: trusts only the peer file and authenticates with its own certificate.
pub fn client_connector(config: &TlsConfig) -> Result<TlsConnector> {
    let client_config = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Config(e.to_string()))?
        .with_root_certificates(load_roots(&config.peer_cert_path)?)
        .with_client_auth_cert(load_certs(&config.cert_path)?, load_private_key(&config.key_path)?)
        .map_err(|e| TlsError::Config(e.to_string()))?;

    Ok(TlsConnector::from(Arc::new(client_config)))
}

pub fn server_name(name: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(name.to_string()).map_err(|e| TlsError::ServerName(format!("{}: {}", name, e)))
}

pub async fn accept(acceptor: &TlsAcceptor, stream: TcpStream) -> Result<server::TlsStream<TcpStream>> {
    acceptor
        .accept(stream)
        .await
        .map_err(|e| TlsError::Handshake(e.to_string()))
}

pub async fn connect(
    connector: &TlsConnector,
    name: ServerName<'static>,
    stream: TcpStream,
    timeout: Option<Duration>,
) -> Result<client::TlsStream<TcpStream>> {
    let handshake = connector.connect(name, stream);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, handshake)
            .await
            .map_err(|_| TlsError::Handshake(format!("timed out after {:?}", limit)))?,
        None => handshake.await,
    };
    result.map_err(|e| TlsError::Handshake(e.to_string()))
}
