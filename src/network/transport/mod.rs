// src/network/transport/mod.rs
pub mod tcp;
pub mod tls;

pub use tls::{client_connector, server_acceptor, server_name};
