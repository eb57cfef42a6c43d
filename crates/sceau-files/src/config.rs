//! Sealing configuration, stored as plain JSON next to the files it governs.
//!
//! Holds no secrets: only KDF cost, file naming and token age policy.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use sceau_crypto_core::{Pbkdf2Params, DEFAULT_ITERATIONS};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::FileError;

// ── Top-level configuration ────────────────────────────────────────

/// Settings applied by [`crate::files`] when sealing and opening files.
///
/// Persisted to `{dir}/sceau.json`. All fields have defaults via
/// [`Default`], so a partial file is still usable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SealConfig {
    /// PBKDF2 iteration count. Changing it makes existing files unreadable
    /// under the new setting.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Suffix appended to encrypted files (e.g. `".aes"`).
    #[serde(default = "default_encrypted_suffix")]
    pub encrypted_suffix: String,

    /// Reject tokens older than this many seconds. `None` disables the check.
    #[serde(default)]
    pub max_token_age_secs: Option<u64>,

    /// Whether an existing destination file may be replaced.
    #[serde(default = "default_overwrite_existing")]
    pub overwrite_existing: bool,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: default_kdf_iterations(),
            encrypted_suffix: default_encrypted_suffix(),
            max_token_age_secs: None,
            overwrite_existing: default_overwrite_existing(),
        }
    }
}

const fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
fn default_encrypted_suffix() -> String {
    ".aes".into()
}
const fn default_overwrite_existing() -> bool {
    true
}

impl SealConfig {
    /// KDF parameters for this configuration.
    #[must_use]
    pub const fn pbkdf2_params(&self) -> Pbkdf2Params {
        Pbkdf2Params {
            iterations: self.kdf_iterations,
        }
    }

    /// Token age limit, if any.
    #[must_use]
    pub fn max_token_age(&self) -> Option<Duration> {
        self.max_token_age_secs.map(Duration::from_secs)
    }

    /// Check settings that would otherwise fail deep inside a file operation.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Config` if the suffix is empty or contains a path
    /// separator, or if `kdf_iterations` is zero.
    pub fn validate(&self) -> Result<(), FileError> {
        if self.encrypted_suffix.is_empty() {
            return Err(FileError::Config(
                "encryptedSuffix must not be empty".into(),
            ));
        }
        if self.encrypted_suffix.contains(['/', '\\']) {
            return Err(FileError::Config(
                "encryptedSuffix must not contain a path separator".into(),
            ));
        }
        if self.kdf_iterations == 0 {
            return Err(FileError::Config(
                "kdfIterations must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// ── File I/O ───────────────────────────────────────────────────────

const CONFIG_FILE: &str = "sceau.json";

impl SealConfig {
    /// Load configuration from `{dir}/sceau.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or contains
    /// invalid JSON.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let Ok(contents) = fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "Corrupt configuration, using defaults: {e}");
            Self::default()
        })
    }

    /// Persist configuration to `{dir}/sceau.json`.
    ///
    /// Writes to a uniquely named temporary file in `dir`, then renames it
    /// into place.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Config` if serialization fails, or `FileError::Io`
    /// if the directory does not exist or the write/rename is rejected.
    pub fn save(&self, dir: &Path) -> Result<(), FileError> {
        let path = dir.join(CONFIG_FILE);

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FileError::Config(format!("cannot serialize configuration: {e}")))?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&path).map_err(|e| FileError::Io(e.error))?;
        tracing::debug!(path = %path.display(), "Configuration saved");

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
