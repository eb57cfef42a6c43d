//! Tokens issued by the earlier password-sealing tool.
//!
//! That tool stretched the password with PBKDF2-HMAC-SHA256 (500 000
//! iterations, caller salt) and sealed a Fernet token under the result.
//! Files and messages it produced must keep opening with the default
//! parameters.

use sceau_crypto_core::token::{inspect, TokenVersion};
use sceau_crypto_core::{decrypt, CryptoError};

/// `"hello world"` sealed with password `"correct horse"`, salt `"battery"`.
const HELLO_WORLD: &str = "gAAAAABq0KE5NY_5M_aGja7jSUTVtdDKxlbtR3M-7Y6Cx2uJIPd3P0iXg4W3BM03RiXRu1zvhtlMAalXw0e-D9LBgR4FNv90mg==";

#[test]
fn legacy_token_is_external_salt_version() {
    let header = inspect(HELLO_WORLD).expect("inspect should succeed");
    assert_eq!(header.version, TokenVersion::ExternalSalt);
    assert_eq!(header.salt, None);
}

#[test]
fn legacy_token_opens_with_default_iterations() {
    let plaintext = decrypt(HELLO_WORLD, b"correct horse", Some(b"battery"))
        .expect("legacy token should decrypt");
    assert_eq!(plaintext.expose(), b"hello world");
}

#[test]
fn legacy_token_rejects_wrong_password() {
    let result = decrypt(HELLO_WORLD, b"wrong horse", Some(b"battery"));
    assert!(matches!(result, Err(CryptoError::Authentication)));
}
