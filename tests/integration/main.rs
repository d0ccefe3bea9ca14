// tests/integration/main.rs
#[path = "../common/mod.rs"]
mod common;

mod config_tests;
mod tls_session_tests;
