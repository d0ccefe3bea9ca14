// src/core/mod.rs
pub mod crypto;
