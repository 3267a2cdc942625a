//! Runtime configuration, loaded from an optional TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProtectionError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding keys, signatures, digests and records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub keys: KeyEntries,

    #[serde(default)]
    pub stores: StoreNames,
}

/// Entry names of the persisted key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntries {
    #[serde(default = "default_encryption_private")]
    pub encryption_private: String,
    #[serde(default = "default_encryption_public")]
    pub encryption_public: String,
    #[serde(default = "default_signing_private")]
    pub signing_private: String,
    #[serde(default = "default_signing_public")]
    pub signing_public: String,
}

impl KeyEntries {
    pub fn names(&self) -> [&str; 4] {
        [
            &self.encryption_private,
            &self.encryption_public,
            &self.signing_private,
            &self.signing_public,
        ]
    }
}

impl Default for KeyEntries {
    fn default() -> Self {
        Self {
            encryption_private: default_encryption_private(),
            encryption_public: default_encryption_public(),
            signing_private: default_signing_private(),
            signing_public: default_signing_public(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreNames {
    /// JSON object file holding signatures and signed payload snapshots
    #[serde(default = "default_signatures_file")]
    pub signatures_file: String,

    /// Extension of the per-record digest files (`<record id>.<ext>`)
    #[serde(default = "default_digest_extension")]
    pub digest_extension: String,

    /// Extension of the per-record sealed metadata files (`<record id>.<ext>`)
    #[serde(default = "default_ciphertext_extension")]
    pub ciphertext_extension: String,
}

impl Default for StoreNames {
    fn default() -> Self {
        Self {
            signatures_file: default_signatures_file(),
            digest_extension: default_digest_extension(),
            ciphertext_extension: default_ciphertext_extension(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("phenoguard-data")
}

fn default_log_filter() -> String {
    "phenoguard=info".to_string()
}

fn default_encryption_private() -> String {
    "sk_hybrid_enc.json".to_string()
}

fn default_encryption_public() -> String {
    "pk_hybrid_enc.json".to_string()
}

fn default_signing_private() -> String {
    "sk_sign.json".to_string()
}

fn default_signing_public() -> String {
    "pk_verify.json".to_string()
}

fn default_signatures_file() -> String {
    "signatures.json".to_string()
}

fn default_digest_extension() -> String {
    "txt".to_string()
}

fn default_ciphertext_extension() -> String {
    "sealed".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_filter: default_log_filter(),
            keys: KeyEntries::default(),
            stores: StoreNames::default(),
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProtectionError::storage(path.display().to_string(), e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| ProtectionError::invalid(format!("configuration: {e}")))
    }
}
