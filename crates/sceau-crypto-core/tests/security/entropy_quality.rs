//! Entropy quality tests for CSPRNG-derived token fields.
//!
//! Shannon entropy for uniform bytes approaches 8.0 bits/byte only as the
//! sample grows. Thresholds below are set well under the expected value for
//! each sample size so they catch degenerate output (constant or repeating
//! bytes) without flaking on natural variance.

use data_encoding::BASE64URL;
use sceau_crypto_core::kdf::Pbkdf2Params;
use sceau_crypto_core::token::{inspect, IV_LEN, SALT_LEN, TIMESTAMP_LEN, VERSION_LEN};
use sceau_crypto_core::{encrypt_with_key, encrypt_with_params, generate_key};

/// Shannon entropy of a byte slice (bits per byte).
#[allow(clippy::cast_precision_loss)]
fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u64; 256];
    for &b in data {
        freq[b as usize] = freq[b as usize].saturating_add(1);
    }
    let len = data.len() as f64;
    freq.iter()
        .filter(|&&f| f > 0)
        .map(|&f| {
            let p = f as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// 64 IVs concatenated (1 KB) — threshold 7.5 bits/byte.
#[test]
fn token_ivs_have_high_entropy() {
    let key = generate_key().expect("CSPRNG should succeed");
    let mut ivs = Vec::with_capacity(64 * IV_LEN);
    for _ in 0..64 {
        let token = encrypt_with_key(b"", &key).unwrap();
        let raw = BASE64URL.decode(token.as_bytes()).unwrap();
        let start = VERSION_LEN + TIMESTAMP_LEN;
        ivs.extend_from_slice(&raw[start..start + IV_LEN]);
    }
    let entropy = shannon_entropy(&ivs);
    assert!(entropy > 7.5, "IV entropy too low: {entropy:.4} (expected > 7.5)");
}

/// 32 embedded salts (512 bytes) — threshold 7.0 bits/byte.
#[test]
fn embedded_salts_have_high_entropy() {
    let params = Pbkdf2Params { iterations: 1 };
    let mut salts = Vec::with_capacity(32 * SALT_LEN);
    for _ in 0..32 {
        let token = encrypt_with_params(b"", b"pw", None, &params).unwrap();
        let salt = inspect(&token).unwrap().salt.expect("embedded salt present");
        salts.extend_from_slice(&salt);
    }
    let entropy = shannon_entropy(&salts);
    assert!(entropy > 7.0, "salt entropy too low: {entropy:.4} (expected > 7.0)");
}

/// A single 32-byte raw key — threshold 4.0 bits/byte.
#[test]
fn raw_key_entropy() {
    let key = generate_key().expect("CSPRNG should succeed");
    let bytes = BASE64URL.decode(key.to_base64().as_bytes()).unwrap();
    let entropy = shannon_entropy(&bytes);
    assert!(entropy > 4.0, "raw key entropy too low: {entropy:.4} (expected > 4.0)");
}

#[test]
fn consecutive_raw_keys_differ() {
    let a = generate_key().unwrap();
    let b = generate_key().unwrap();
    assert_ne!(a.to_base64(), b.to_base64());
}
