// src/network/mod.rs
pub mod auth;
pub mod client;
pub mod error;
pub mod framer;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::run_client;
pub use error::{AuthError, FrameError, SessionError, TlsError};
pub use framer::{FrameLimits, Framer, ReadBudget};
pub use protocol::{serve_connection, ClientReport, ClientSession, KeySource, ServerContext, SessionState};
pub use server::{LweServer, SessionReport};
