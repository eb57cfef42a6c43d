//! Whole-file sealing with the `.aes` naming convention.
//!
//! `report.pdf` is sealed into `report.pdf.aes`, whose contents are a single
//! token in text form. Opening `report.pdf.aes` writes `report.pdf` back.
//!
//! Nothing is written until the crypto step has succeeded, so a wrong
//! password never leaves a partial or empty output file behind.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sceau_crypto_core::{decrypt_with_params, encrypt_with_params, CryptoError};
use tempfile::NamedTempFile;
use zeroize::Zeroize;

use crate::config::SealConfig;
use crate::error::FileError;

/// Path of the sealed counterpart of `path`: the suffix is appended to the
/// full file name.
#[must_use]
pub fn encrypted_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the plaintext counterpart of `path`, or `None` if the file name
/// does not end with `suffix` (or would be empty once it is removed).
///
/// The file name itself need not be valid UTF-8.
#[must_use]
pub fn decrypted_path(path: &Path, suffix: &str) -> Option<PathBuf> {
    if suffix.is_empty() {
        return None;
    }
    let name = path.file_name()?.as_encoded_bytes();
    let stem = name.strip_suffix(suffix.as_bytes())?;
    if stem.is_empty() {
        return None;
    }
    // SAFETY: `stem` is `name` with a non-empty UTF-8 suffix removed, so it
    // ends on a valid boundary of the original encoded string.
    let stem = unsafe { OsStr::from_encoded_bytes_unchecked(stem) };
    Some(path.with_file_name(stem))
}

/// Seal the file at `path` and write the token to `path + suffix`.
///
/// Returns the path of the sealed file.
///
/// # Errors
///
/// - `FileError::Config` for an unusable configuration
/// - `FileError::AlreadyExists` if the destination exists and overwriting is off
/// - `FileError::Io` if the source cannot be read or the destination written
/// - `FileError::Crypto` for invalid password or salt parameters
pub fn encrypt_file(
    path: &Path,
    password: &[u8],
    salt: Option<&[u8]>,
    config: &SealConfig,
) -> Result<PathBuf, FileError> {
    config.validate()?;
    let dest = encrypted_path(path, &config.encrypted_suffix);
    ensure_writable(&dest, config)?;

    let mut plaintext = fs::read(path)?;
    let sealed = encrypt_with_params(&plaintext, password, salt, &config.pbkdf2_params());
    let plaintext_len = plaintext.len();
    plaintext.zeroize();
    let token = sealed?;

    write_atomic(&dest, token.as_bytes())?;

    tracing::debug!(
        plaintext_bytes = plaintext_len,
        token_bytes = token.as_bytes().len(),
        "File sealed"
    );
    tracing::info!(source = %path.display(), dest = %dest.display(), "Encrypted file");
    Ok(dest)
}

/// Open the sealed file at `path` and write the plaintext next to it with
/// the suffix removed.
///
/// Returns the path of the recovered file.
///
/// # Errors
///
/// - `FileError::MissingSuffix` if `path` does not end with the suffix
/// - `FileError::AlreadyExists` if the destination exists and overwriting is off
/// - `FileError::Crypto` for malformed tokens, authentication failure or an
///   expired token
/// - `FileError::Io` for read/write failures
pub fn decrypt_file(
    path: &Path,
    password: &[u8],
    salt: Option<&[u8]>,
    config: &SealConfig,
) -> Result<PathBuf, FileError> {
    config.validate()?;
    let dest = decrypted_path(path, &config.encrypted_suffix)
        .ok_or_else(|| FileError::MissingSuffix(path.to_path_buf()))?;
    ensure_writable(&dest, config)?;

    let token = fs::read(path)?;
    let plaintext = decrypt_with_params(
        &token,
        password,
        salt,
        &config.pbkdf2_params(),
        config.max_token_age(),
    )
    .inspect_err(|e| {
        if matches!(e, CryptoError::Authentication) {
            tracing::warn!(path = %path.display(), "Authentication failed for sealed file");
        }
    })?;

    write_atomic(&dest, plaintext.expose())?;

    tracing::debug!(plaintext_bytes = plaintext.len(), "File opened");
    tracing::info!(source = %path.display(), dest = %dest.display(), "Decrypted file");
    Ok(dest)
}

fn ensure_writable(dest: &Path, config: &SealConfig) -> Result<(), FileError> {
    if !config.overwrite_existing && dest.exists() {
        return Err(FileError::AlreadyExists(dest.to_path_buf()));
    }
    Ok(())
}

/// Write `bytes` to a uniquely named temporary file next to `dest`, then
/// rename it into place. The temporary file is removed on any failure.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), FileError> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| FileError::Io(e.error))?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────
