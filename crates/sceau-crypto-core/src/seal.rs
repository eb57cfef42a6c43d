//! Message-level API: password-sealed and raw-key tokens.
//!
//! This module provides:
//! - [`encrypt`] / [`decrypt`] — password + optional salt, default KDF parameters
//! - [`encrypt_with_params`] / [`decrypt_with_params`] — explicit KDF parameters and token age limit
//! - [`generate_key`] / [`RawKey`] — random 32-byte keys that bypass password derivation
//! - [`encrypt_with_key`] / [`decrypt_with_key`] — direct key-based tokens
//!
//! # Salt Modes
//!
//! - `Some(salt)` — the caller supplies a non-empty domain-separation salt
//!   and must supply it again to decrypt. Produces version `0x80` tokens.
//! - `None` — a fresh random 16-byte salt is generated and embedded in the
//!   token. Produces version `0x81` tokens; decrypt with `None` as well.
//!
//! An absent salt is never handed to the KDF.
//!
//! A salt mode that does not match the token's version byte is reported as
//! [`CryptoError::Authentication`], the same as any other tampering: the
//! version byte is covered by the MAC, and flipping `0x80` and `0x81` must not
//! tell an attacker anything a wrong password would not.

use std::time::Duration;

use crate::error::CryptoError;
use crate::kdf::{self, DerivedKeyMaterial, Pbkdf2Params, OUTPUT_LEN};
use crate::memory::{SecretBuffer, SecretBytes};
use crate::token::{self, SystemClock, Token, SALT_LEN};
use data_encoding::BASE64URL;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

/// Raw key length in bytes (signing half + encryption half).
pub const RAW_KEY_LEN: usize = OUTPUT_LEN;

// ---------------------------------------------------------------------------
// Raw keys
// ---------------------------------------------------------------------------

/// A random 32-byte key, independent of any password.
///
/// Split with the same 16/16 convention as password-derived material.
pub struct RawKey(SecretBytes<RAW_KEY_LEN>);

impl RawKey {
    /// Draw a fresh key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Randomness` if the CSPRNG fails.
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self(SecretBytes::random()?))
    }

    /// Parse a key from padded URL-safe base64.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidParameter` if the text is not base64url
    /// or does not decode to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = BASE64URL
            .decode(encoded.trim().as_bytes())
            .map_err(|e| CryptoError::InvalidParameter(format!("raw key is not base64url: {e}")))?;
        let key = SecretBytes::from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(key?))
    }

    /// Encode the key as padded URL-safe base64 for display or storage.
    ///
    /// The returned string is key material; treat it accordingly.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64URL.encode(self.0.expose())
    }

    /// Split the key into signing and encryption halves.
    #[must_use]
    pub fn key_material(&self) -> DerivedKeyMaterial {
        DerivedKeyMaterial::from_bytes(self.0.expose())
    }
}

impl std::fmt::Debug for RawKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RawKey(***)")
    }
}

/// Produce a fresh random key for direct key-based encryption.
///
/// # Errors
///
/// Returns `CryptoError::Randomness` if the CSPRNG fails.
pub fn generate_key() -> Result<RawKey, CryptoError> {
    RawKey::generate()
}

// ---------------------------------------------------------------------------
// Password-sealed tokens
// ---------------------------------------------------------------------------

/// Seal `plaintext` under `password` with the default KDF parameters.
///
/// # Errors
///
/// See [`encrypt_with_params`].
pub fn encrypt(
    plaintext: &[u8],
    password: &[u8],
    salt: Option<&[u8]>,
) -> Result<Token, CryptoError> {
    encrypt_with_params(plaintext, password, salt, &Pbkdf2Params::default())
}

/// Seal `plaintext` under `password` with explicit KDF parameters.
///
/// Keys are derived fresh for this call and dropped (zeroized) before it
/// returns.
///
/// # Errors
///
/// - `CryptoError::InvalidParameter` for an empty password, an empty salt,
///   or zero iterations
/// - `CryptoError::Randomness` if the salt or IV cannot be generated
pub fn encrypt_with_params(
    plaintext: &[u8],
    password: &[u8],
    salt: Option<&[u8]>,
    params: &Pbkdf2Params,
) -> Result<Token, CryptoError> {
    if let Some(salt) = salt {
        let keys = kdf::derive(password, salt, params)?;
        return token::encode(plaintext, &keys, &SystemClock, &mut OsRng);
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::Randomness(format!("salt generation failed: {e}")))?;
    let keys = kdf::derive(password, &salt, params)?;
    token::encode_with_salt(plaintext, &salt, &keys, &SystemClock, &mut OsRng)
}

/// Open a token sealed by [`encrypt`].
///
/// # Errors
///
/// See [`decrypt_with_params`].
pub fn decrypt(
    token: impl AsRef<[u8]>,
    password: &[u8],
    salt: Option<&[u8]>,
) -> Result<SecretBuffer, CryptoError> {
    decrypt_with_params(token, password, salt, &Pbkdf2Params::default(), None)
}

/// Open a password-sealed token with explicit KDF parameters and an optional
/// age limit.
///
/// `Some(salt)` opens version `0x80` tokens, `None` opens version `0x81`
/// tokens. Any other pairing fails authentication.
///
/// # Errors
///
/// - `CryptoError::MalformedToken` for structural problems
/// - `CryptoError::InvalidParameter` for bad KDF inputs
/// - `CryptoError::Authentication` for a wrong password, wrong salt, a
///   salt-mode / version mismatch, or tampering
/// - `CryptoError::Expired` / `CryptoError::FutureTimestamp` when `max_age` is set
pub fn decrypt_with_params(
    token: impl AsRef<[u8]>,
    password: &[u8],
    salt: Option<&[u8]>,
    params: &Pbkdf2Params,
    max_age: Option<Duration>,
) -> Result<SecretBuffer, CryptoError> {
    let token = token.as_ref();
    let header = token::inspect(token)?;

    // A caller salt always wins: on a 0x81 token the MAC then fails to verify.
    let keys = match (salt, header.salt) {
        (Some(salt), _) => kdf::derive(password, salt, params)?,
        (None, Some(embedded)) => kdf::derive(password, &embedded, params)?,
        (None, None) => return Err(CryptoError::Authentication),
    };

    open(token, &keys, max_age)
}

// ---------------------------------------------------------------------------
// Raw-key tokens
// ---------------------------------------------------------------------------

/// Seal `plaintext` directly under a [`RawKey`] (version `0x80`).
///
/// # Errors
///
/// Returns `CryptoError::Randomness` if the IV cannot be generated.
pub fn encrypt_with_key(plaintext: &[u8], key: &RawKey) -> Result<Token, CryptoError> {
    token::encode(plaintext, &key.key_material(), &SystemClock, &mut OsRng)
}

/// Open a token sealed by [`encrypt_with_key`].
///
/// # Errors
///
/// - `CryptoError::MalformedToken` for structural problems
/// - `CryptoError::Authentication` for a wrong key, a password-sealed `0x81`
///   token, or tampering
/// - `CryptoError::Expired` / `CryptoError::FutureTimestamp` when `max_age` is set
pub fn decrypt_with_key(
    token: impl AsRef<[u8]>,
    key: &RawKey,
    max_age: Option<Duration>,
) -> Result<SecretBuffer, CryptoError> {
    open(token.as_ref(), &key.key_material(), max_age)
}

fn open(
    token: &[u8],
    keys: &DerivedKeyMaterial,
    max_age: Option<Duration>,
) -> Result<SecretBuffer, CryptoError> {
    match max_age {
        Some(max_age) => token::decode_with_max_age(token, keys, max_age, &SystemClock),
        None => token::decode(token, keys),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
