//! File-level error types for `sceau-files`.

use std::path::PathBuf;

use sceau_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by file wrapping and configuration.
#[derive(Debug, Error)]
pub enum FileError {
    /// Key derivation or token handling failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path to decrypt does not end with the configured suffix.
    #[error("{} does not end with the encrypted-file suffix", .0.display())]
    MissingSuffix(PathBuf),

    /// The destination exists and overwriting is disabled.
    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Configuration could not be serialized or is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}
