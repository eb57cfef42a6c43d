//! Versioned authenticated-encryption tokens (AES-128-CBC + HMAC-SHA256).
//!
//! This module provides:
//! - [`encode`] / [`encode_with_salt`] — seal plaintext into a [`Token`]
//! - [`decode`] / [`decode_with_max_age`] — authenticate, then decrypt a [`Token`]
//! - [`inspect`] — unauthenticated structural view of a token ([`TokenHeader`])
//! - [`extract_timestamp`] — authenticated read of the issue timestamp
//! - [`TimeSource`] — injectable clock ([`SystemClock`], [`FixedClock`])
//!
//! # Wire Format
//!
//! ```text
//! 0x80: version (1) | timestamp (8, BE) | IV (16) | ciphertext (16·k) | MAC (32)
//! 0x81: version (1) | salt (16) | timestamp (8, BE) | IV (16) | ciphertext (16·k) | MAC (32)
//! ```
//!
//! The MAC is HMAC-SHA256 under the signing key over every byte preceding it.
//! The byte sequence is carried as padded URL-safe base64 with no line breaks.
//! Version `0x80` is byte-compatible with Fernet tokens.
//!
//! # Verification Order
//!
//! The MAC is compared in constant time (`ring::hmac::verify`) before any
//! decryption or timestamp policy is applied. A MAC mismatch always yields
//! [`CryptoError::Authentication`], whatever the cause.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::CryptoError;
use crate::kdf::DerivedKeyMaterial;
use crate::memory::SecretBuffer;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use data_encoding::BASE64URL;
use rand::{CryptoRng, RngCore};
use ring::hmac;
use serde::{Deserialize, Serialize};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Version byte for tokens whose KDF salt is supplied by the caller.
pub const VERSION_EXTERNAL_SALT: u8 = 0x80;

/// Version byte for tokens that carry their own KDF salt.
pub const VERSION_EMBEDDED_SALT: u8 = 0x81;

/// Length of the version field.
pub const VERSION_LEN: usize = 1;

/// Length of the big-endian Unix timestamp field.
pub const TIMESTAMP_LEN: usize = 8;

/// Length of the embedded salt (version `0x81` only).
pub const SALT_LEN: usize = 16;

/// AES-CBC initialization vector length.
pub const IV_LEN: usize = 16;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// HMAC-SHA256 output length.
pub const MAC_LEN: usize = 32;

/// Tolerated clock skew for tokens stamped in the future.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

/// Header length for version `0x80`.
const EXTERNAL_HEADER_LEN: usize = VERSION_LEN + TIMESTAMP_LEN + IV_LEN;

/// Header length for version `0x81`.
const EMBEDDED_HEADER_LEN: usize = EXTERNAL_HEADER_LEN + SALT_LEN;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Token layout selected by the leading version byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenVersion {
    /// `0x80` — salt supplied by the caller (or no salt, for raw keys).
    ExternalSalt,
    /// `0x81` — random salt embedded after the version byte.
    EmbeddedSalt,
}

impl TokenVersion {
    /// The wire byte for this version.
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            Self::ExternalSalt => VERSION_EXTERNAL_SALT,
            Self::EmbeddedSalt => VERSION_EMBEDDED_SALT,
        }
    }

    /// Parse a wire byte. Returns `None` for unknown versions.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            VERSION_EXTERNAL_SALT => Some(Self::ExternalSalt),
            VERSION_EMBEDDED_SALT => Some(Self::EmbeddedSalt),
            _ => None,
        }
    }

    const fn header_len(self) -> usize {
        match self {
            Self::ExternalSalt => EXTERNAL_HEADER_LEN,
            Self::EmbeddedSalt => EMBEDDED_HEADER_LEN,
        }
    }

    /// Smallest valid token: header, one cipher block, MAC.
    const fn min_len(self) -> usize {
        match self {
            Self::ExternalSalt => EXTERNAL_HEADER_LEN + BLOCK_LEN + MAC_LEN,
            Self::EmbeddedSalt => EMBEDDED_HEADER_LEN + BLOCK_LEN + MAC_LEN,
        }
    }
}

/// An encoded token in URL-safe base64 text form.
///
/// Immutable once produced. Not secret: it may be stored or transmitted
/// freely.
#[must_use = "a sealed token must be stored or transmitted"]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Borrow the base64 text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrow the base64 text as ASCII bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consume the token, returning the base64 text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Unauthenticated view of a token's fixed fields.
///
/// Produced by [`inspect`]. Nothing here is trustworthy until the token has
/// been decoded with the right keys; it exists so the caller can choose the
/// KDF salt before authenticating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenHeader {
    /// Layout version.
    pub version: TokenVersion,
    /// Claimed issue time (Unix seconds).
    pub timestamp: u64,
    /// Embedded KDF salt (version `0x81` only).
    pub salt: Option<[u8; SALT_LEN]>,
}

/// Source of the current Unix time in seconds.
pub trait TimeSource {
    /// Current time as Unix seconds.
    fn now_unix(&self) -> u64;
}

/// Wall clock backed by [`SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }
}

/// Clock frozen at a fixed Unix time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl TimeSource for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

/// Borrowed, structurally validated token bytes.
struct Frame<'a> {
    version: TokenVersion,
    salt: Option<&'a [u8]>,
    timestamp: u64,
    iv: &'a [u8],
    ciphertext: &'a [u8],
    /// Everything the MAC covers.
    authenticated: &'a [u8],
    mac: &'a [u8],
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Seal `plaintext` into a version `0x80` token.
///
/// The IV is drawn from `rng` and the timestamp from `clock`.
///
/// # Errors
///
/// Returns `CryptoError::Randomness` if the IV cannot be generated.
pub fn encode(
    plaintext: &[u8],
    keys: &DerivedKeyMaterial,
    clock: &impl TimeSource,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Token, CryptoError> {
    seal_frame(TokenVersion::ExternalSalt, None, plaintext, keys, clock, rng)
}

/// Seal `plaintext` into a version `0x81` token carrying `salt`.
///
/// The salt is covered by the MAC. `keys` must have been derived with the
/// same salt for the token to be openable.
///
/// # Errors
///
/// Returns `CryptoError::Randomness` if the IV cannot be generated.
pub fn encode_with_salt(
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    keys: &DerivedKeyMaterial,
    clock: &impl TimeSource,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Token, CryptoError> {
    seal_frame(
        TokenVersion::EmbeddedSalt,
        Some(salt),
        plaintext,
        keys,
        clock,
        rng,
    )
}

fn seal_frame(
    version: TokenVersion,
    salt: Option<&[u8; SALT_LEN]>,
    plaintext: &[u8],
    keys: &DerivedKeyMaterial,
    clock: &impl TimeSource,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Token, CryptoError> {
    let mut iv = [0u8; IV_LEN];
    rng.try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::Randomness(format!("IV generation failed: {e}")))?;

    let ciphertext = Aes128CbcEnc::new_from_slices(keys.encryption_key().expose(), &iv)
        .map_err(|_| CryptoError::InvalidParameter("invalid AES-128-CBC key or IV length".into()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let capacity = version
        .header_len()
        .saturating_add(ciphertext.len())
        .saturating_add(MAC_LEN);
    let mut out = Vec::with_capacity(capacity);
    out.push(version.byte());
    if let Some(salt) = salt {
        out.extend_from_slice(salt);
    }
    out.extend_from_slice(&clock.now_unix().to_be_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);

    let key = hmac::Key::new(hmac::HMAC_SHA256, keys.signing_key().expose());
    let tag = hmac::sign(&key, &out);
    out.extend_from_slice(tag.as_ref());

    Ok(Token(BASE64URL.encode(&out)))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse a token's fixed fields without authenticating it.
///
/// # Errors
///
/// Returns `CryptoError::MalformedToken` if the token is not base64url, is
/// too short, has unaligned ciphertext, or carries an unknown version byte.
pub fn inspect(token: impl AsRef<[u8]>) -> Result<TokenHeader, CryptoError> {
    let bytes = decode_base64(token.as_ref())?;
    let frame = parse_frame(&bytes)?;

    let salt = frame.salt.map(|s| {
        let mut out = [0u8; SALT_LEN];
        out.copy_from_slice(s);
        out
    });

    Ok(TokenHeader {
        version: frame.version,
        timestamp: frame.timestamp,
        salt,
    })
}

/// Authenticate and decrypt a token.
///
/// # Errors
///
/// - `CryptoError::MalformedToken` for structural problems, or invalid
///   padding after successful authentication
/// - `CryptoError::Authentication` if the MAC does not verify
pub fn decode(
    token: impl AsRef<[u8]>,
    keys: &DerivedKeyMaterial,
) -> Result<SecretBuffer, CryptoError> {
    let bytes = decode_base64(token.as_ref())?;
    let frame = parse_frame(&bytes)?;
    verify_frame(&frame, keys)?;
    decrypt_frame(&frame, keys)
}

/// Authenticate a token, enforce its age, then decrypt it.
///
/// A token is expired when more than `max_age` has elapsed since its
/// timestamp. Tokens stamped more than [`MAX_CLOCK_SKEW_SECS`] ahead of
/// `clock` are rejected. Both checks run only after the MAC verifies.
///
/// # Errors
///
/// Everything [`decode`] returns, plus `CryptoError::Expired` and
/// `CryptoError::FutureTimestamp`.
pub fn decode_with_max_age(
    token: impl AsRef<[u8]>,
    keys: &DerivedKeyMaterial,
    max_age: Duration,
    clock: &impl TimeSource,
) -> Result<SecretBuffer, CryptoError> {
    let bytes = decode_base64(token.as_ref())?;
    let frame = parse_frame(&bytes)?;
    verify_frame(&frame, keys)?;
    check_age(frame.timestamp, max_age, clock.now_unix())?;
    decrypt_frame(&frame, keys)
}

/// Return the issue timestamp of an authentic token.
///
/// # Errors
///
/// `CryptoError::MalformedToken` or `CryptoError::Authentication` as for
/// [`decode`].
pub fn extract_timestamp(
    token: impl AsRef<[u8]>,
    keys: &DerivedKeyMaterial,
) -> Result<u64, CryptoError> {
    let bytes = decode_base64(token.as_ref())?;
    let frame = parse_frame(&bytes)?;
    verify_frame(&frame, keys)?;
    Ok(frame.timestamp)
}

fn decode_base64(token: &[u8]) -> Result<Vec<u8>, CryptoError> {
    BASE64URL
        .decode(token.trim_ascii())
        .map_err(|e| CryptoError::MalformedToken(format!("not valid base64url: {e}")))
}

fn parse_frame(bytes: &[u8]) -> Result<Frame<'_>, CryptoError> {
    let Some(&version_byte) = bytes.first() else {
        return Err(CryptoError::MalformedToken("empty token".into()));
    };
    let version = TokenVersion::from_byte(version_byte).ok_or_else(|| {
        CryptoError::MalformedToken(format!("unknown version byte 0x{version_byte:02x}"))
    })?;

    if bytes.len() < version.min_len() {
        return Err(CryptoError::MalformedToken(format!(
            "token too short: {} bytes (minimum {})",
            bytes.len(),
            version.min_len()
        )));
    }

    // The length guard above makes every split below in bounds.
    let mac_start = bytes.len().saturating_sub(MAC_LEN);
    let (authenticated, mac) = bytes.split_at(mac_start);
    let (_, after_version) = authenticated.split_at(VERSION_LEN);

    let (salt, after_salt) = match version {
        TokenVersion::ExternalSalt => (None, after_version),
        TokenVersion::EmbeddedSalt => {
            let (salt, rest) = after_version.split_at(SALT_LEN);
            (Some(salt), rest)
        }
    };

    let (timestamp_bytes, after_timestamp) = after_salt.split_at(TIMESTAMP_LEN);
    let (iv, ciphertext) = after_timestamp.split_at(IV_LEN);

    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::MalformedToken(format!(
            "ciphertext length {} is not a multiple of {BLOCK_LEN}",
            ciphertext.len()
        )));
    }

    let mut timestamp = [0u8; TIMESTAMP_LEN];
    timestamp.copy_from_slice(timestamp_bytes);

    Ok(Frame {
        version,
        salt,
        timestamp: u64::from_be_bytes(timestamp),
        iv,
        ciphertext,
        authenticated,
        mac,
    })
}

fn verify_frame(frame: &Frame<'_>, keys: &DerivedKeyMaterial) -> Result<(), CryptoError> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, keys.signing_key().expose());
    hmac::verify(&key, frame.authenticated, frame.mac).map_err(|_| CryptoError::Authentication)
}

fn decrypt_frame(
    frame: &Frame<'_>,
    keys: &DerivedKeyMaterial,
) -> Result<SecretBuffer, CryptoError> {
    let plaintext = Aes128CbcDec::new_from_slices(keys.encryption_key().expose(), frame.iv)
        .map_err(|_| CryptoError::InvalidParameter("invalid AES-128-CBC key or IV length".into()))?
        .decrypt_padded_vec_mut::<Pkcs7>(frame.ciphertext)
        .map_err(|_| CryptoError::MalformedToken("invalid padding".into()))?;
    Ok(SecretBuffer::from_vec(plaintext))
}

fn check_age(timestamp: u64, max_age: Duration, now: u64) -> Result<(), CryptoError> {
    if let Some(skew_secs) = timestamp.checked_sub(now) {
        if skew_secs > MAX_CLOCK_SKEW_SECS {
            return Err(CryptoError::FutureTimestamp { skew_secs });
        }
        return Ok(());
    }

    let age_secs = now.saturating_sub(timestamp);
    let max_age_secs = max_age.as_secs();
    if age_secs > max_age_secs {
        return Err(CryptoError::Expired {
            age_secs,
            max_age_secs,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
