//! Cryptographic error types for `sceau-crypto-core`.

use thiserror::Error;

/// Errors produced by key derivation and token operations.
///
/// No variant ever carries secret material (password, derived keys,
/// plaintext). Messages only describe structure and parameters.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A local precondition failed (empty password or salt, zero iterations,
    /// undecodable raw key, salt supplied where none is accepted).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The token is structurally invalid: not base64, too short, unaligned
    /// ciphertext, unknown version byte, or padding rejected after
    /// authentication.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// MAC verification failed.
    ///
    /// Wrong password, wrong salt and bit-level tampering are deliberately
    /// indistinguishable: every cause maps to this single variant.
    #[error("decryption failed: wrong password, wrong salt, or tampered token")]
    Authentication,

    /// The token authenticated but is older than the permitted age.
    #[error("token expired: issued {age_secs}s ago (limit {max_age_secs}s)")]
    Expired {
        /// Seconds elapsed since the token timestamp.
        age_secs: u64,
        /// Maximum age the caller accepted.
        max_age_secs: u64,
    },

    /// The token authenticated but its timestamp lies too far in the future.
    #[error("token timestamp is {skew_secs}s in the future")]
    FutureTimestamp {
        /// Seconds between the current time and the token timestamp.
        skew_secs: u64,
    },

    /// The operating system CSPRNG could not produce bytes.
    #[error("secure random generation failed: {0}")]
    Randomness(String),
}
