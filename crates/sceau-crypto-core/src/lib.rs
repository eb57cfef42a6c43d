//! `sceau-crypto-core` — password-based authenticated encryption.
//!
//! Passwords are stretched with PBKDF2-HMAC-SHA256 into a signing key and an
//! encryption key, then messages are sealed into versioned tokens
//! (AES-128-CBC + HMAC-SHA256, URL-safe base64). No I/O, no async, no global
//! state: every operation is a pure function of its arguments plus the OS
//! CSPRNG and clock.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod token;

pub mod seal;

pub use error::CryptoError;
pub use kdf::{calibrate, derive, DerivedKeyMaterial, Pbkdf2Params, DEFAULT_ITERATIONS};
pub use memory::{SecretBuffer, SecretBytes};
pub use seal::{
    decrypt, decrypt_with_key, decrypt_with_params, encrypt, encrypt_with_key,
    encrypt_with_params, generate_key, RawKey, RAW_KEY_LEN,
};
pub use token::{FixedClock, SystemClock, TimeSource, Token, TokenHeader, TokenVersion};
