// src/network/transport/tcp.rs

use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::network::error::{Result, SessionError};

/// Binds the server's listening socket.
pub async fn listen(address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(address).await.map_err(|e| SessionError::Connect {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    if let Ok(local) = listener.local_addr() {
        info!(%local, "listening");
    }
    Ok(listener)
}

/// Opens a TCP connection, failing after `timeout` when one is given.
pub async fn connect(address: &str, timeout: Option<Duration>) -> Result<TcpStream> {
    let connect = TcpStream::connect(address);
    let stream = match timeout {
        Some(limit) => match tokio::time::timeout(limit, connect).await {
            Ok(result) => result,
            Err(_) => {
                return Err(SessionError::Connect {
                    address: address.to_string(),
                    reason: format!("timed out after {:?}", limit),
                })
            }
        },
        None => connect.await,
    }
    .map_err(|e| SessionError::Connect {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    stream.set_nodelay(true)?;
    debug!(peer = %address, "tcp connection established");
    Ok(stream)
}
