//! `sceau-files` — file wrapping and configuration for SCEAU.
//!
//! Seals whole files into `.aes` token files using `sceau-crypto-core`,
//! loads sealing settings from `sceau.json`, and reports activity through
//! `tracing`. Secrets never reach a log line.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod config;
pub mod error;
pub mod files;

pub use config::SealConfig;
pub use error::FileError;
pub use files::{decrypt_file, decrypted_path, encrypt_file, encrypted_path};
