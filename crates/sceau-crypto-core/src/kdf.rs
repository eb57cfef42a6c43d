//! PBKDF2-HMAC-SHA256 key derivation with a fixed 16/16 key split.
//!
//! This module provides:
//! - [`derive`] — turn a password + salt into [`DerivedKeyMaterial`]
//! - [`calibrate`] — benchmark hardware and return an iteration count for a target duration
//! - [`Pbkdf2Params`] — serializable parameter set
//! - [`DerivedKeyMaterial`] — signing key + encryption key pair
//!
//! # Key Split
//!
//! The 32-byte KDF output is split in a fixed order that every issued token
//! depends on:
//!
//! ```text
//! output[0..16]  → signing key    (HMAC-SHA256)
//! output[16..32] → encryption key (AES-128-CBC)
//! ```

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use crate::error::CryptoError;
use crate::memory::SecretBytes;
use ring::pbkdf2;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Output length of the KDF in bytes.
pub const OUTPUT_LEN: usize = 32;

/// Length of each half of the derived key material.
pub const SUBKEY_LEN: usize = 16;

/// Default iteration count.
pub const DEFAULT_ITERATIONS: u32 = 500_000;

/// Upper bound returned by [`calibrate`].
pub const MAX_CALIBRATED_ITERATIONS: u32 = 10_000_000;

/// Iterations used for the calibration trial.
const TRIAL_ITERATIONS: u32 = 20_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// PBKDF2 parameter set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    /// Number of HMAC-SHA256 iterations. Must be non-zero.
    pub iterations: u32,
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Key material derived from a password or taken from a raw key.
///
/// Both halves are zeroized on drop.
pub struct DerivedKeyMaterial {
    signing_key: SecretBytes<SUBKEY_LEN>,
    encryption_key: SecretBytes<SUBKEY_LEN>,
}

impl DerivedKeyMaterial {
    /// Split 32 bytes of key material: first half signs, second half encrypts.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; OUTPUT_LEN]) -> Self {
        let mut signing = [0u8; SUBKEY_LEN];
        let mut encryption = [0u8; SUBKEY_LEN];
        signing.copy_from_slice(&bytes[..SUBKEY_LEN]);
        encryption.copy_from_slice(&bytes[SUBKEY_LEN..]);

        let keys = Self {
            signing_key: SecretBytes::new(signing),
            encryption_key: SecretBytes::new(encryption),
        };
        signing.zeroize();
        encryption.zeroize();
        keys
    }

    /// HMAC-SHA256 key.
    #[must_use]
    pub const fn signing_key(&self) -> &SecretBytes<SUBKEY_LEN> {
        &self.signing_key
    }

    /// AES-128-CBC key.
    #[must_use]
    pub const fn encryption_key(&self) -> &SecretBytes<SUBKEY_LEN> {
        &self.encryption_key
    }
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyMaterial")
            .field("signing_key", &"[REDACTED]")
            .field("encryption_key", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Core KDF
// ---------------------------------------------------------------------------

/// Derive signing and encryption keys from a password and salt.
///
/// Deterministic: identical password, salt and iteration count always yield
/// identical key material. Reads only its arguments, so concurrent calls
/// need no synchronization.
///
/// # Errors
///
/// Returns `CryptoError::InvalidParameter` if the password is empty, the salt
/// is empty, or `params.iterations` is zero.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    params: &Pbkdf2Params,
) -> Result<DerivedKeyMaterial, CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::InvalidParameter(
            "password must not be empty".into(),
        ));
    }
    if salt.is_empty() {
        return Err(CryptoError::InvalidParameter(
            "salt must not be empty".into(),
        ));
    }
    let iterations = NonZeroU32::new(params.iterations).ok_or_else(|| {
        CryptoError::InvalidParameter("iteration count must be greater than zero".into())
    })?;

    let mut output = [0u8; OUTPUT_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password,
        &mut output,
    );

    let keys = DerivedKeyMaterial::from_bytes(&output);
    output.zeroize();
    Ok(keys)
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Benchmark the current hardware and return an iteration count that takes
/// roughly `target` per derivation.
///
/// The result never drops below [`DEFAULT_ITERATIONS`] and never exceeds
/// [`MAX_CALIBRATED_ITERATIONS`].
///
/// # Errors
///
/// Returns `CryptoError::InvalidParameter` if the trial derivation fails.
pub fn calibrate(target: Duration) -> Result<Pbkdf2Params, CryptoError> {
    let trial = Pbkdf2Params {
        iterations: TRIAL_ITERATIONS,
    };

    let start = Instant::now();
    let _keys = derive(b"sceau-calibration", b"sceau-calibration-salt", &trial)?;
    let elapsed = start.elapsed().as_nanos().max(1);

    let scaled = target
        .as_nanos()
        .checked_mul(u128::from(TRIAL_ITERATIONS))
        .and_then(|n| n.checked_div(elapsed))
        .unwrap_or(u128::from(MAX_CALIBRATED_ITERATIONS));

    let iterations = u32::try_from(scaled)
        .unwrap_or(MAX_CALIBRATED_ITERATIONS)
        .clamp(DEFAULT_ITERATIONS, MAX_CALIBRATED_ITERATIONS);

    Ok(Pbkdf2Params { iterations })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
