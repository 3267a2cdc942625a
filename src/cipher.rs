//! Context-bound hybrid encryption of individual field values.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use phenoguard_crypto::{hybrid_decrypt, hybrid_encrypt};
use tracing::debug;

use crate::error::{ProtectionError, Result};
use crate::keystore::KeyStore;

/// Which part of a record an encryption pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherMode {
    /// Individual sensitive values (subject age, metadata creator),
    /// replaced in place by their Base64 ciphertext.
    #[default]
    Fields,
    /// The whole metadata block, moved out of the record into the
    /// ciphertext store.
    MetadataBlock,
}

/// Encrypts to the store's encryption public key; decrypts with its
/// private key. Every ciphertext is bound to the context it was produced
/// with and will not decrypt under any other.
#[derive(Debug, Clone)]
pub struct HybridCipher {
    keys: Arc<KeyStore>,
}

impl HybridCipher {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    pub fn encrypt(&self, plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        if plaintext.is_empty() {
            return Err(ProtectionError::invalid("plaintext must not be empty"));
        }
        if context.is_empty() {
            return Err(ProtectionError::invalid("context must not be empty"));
        }
        let pair = self.keys.encryption_key_pair()?;
        let ciphertext = hybrid_encrypt(pair.public_key(), plaintext, context)?;
        debug!(
            plaintext_len = plaintext.len(),
            ciphertext_len = ciphertext.len(),
            "Encrypted value"
        );
        Ok(ciphertext)
    }

    pub fn decrypt(&self, ciphertext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() {
            return Err(ProtectionError::invalid("ciphertext must not be empty"));
        }
        if context.is_empty() {
            return Err(ProtectionError::invalid("context must not be empty"));
        }
        let pair = self.keys.encryption_key_pair()?;
        Ok(hybrid_decrypt(pair.secret_key(), ciphertext, context)?)
    }

    /// Encrypt a text value and return the ciphertext as standard Base64.
    pub fn encrypt_to_base64(&self, plaintext: &str, context: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(self.encrypt(plaintext.as_bytes(), context)?))
    }

    /// Inverse of [`encrypt_to_base64`](Self::encrypt_to_base64).
    pub fn decrypt_from_base64(&self, encoded: &str, context: &[u8]) -> Result<String> {
        let ciphertext = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProtectionError::invalid(format!("ciphertext is not valid Base64: {e}")))?;
        let plaintext = self.decrypt(&ciphertext, context)?;
        String::from_utf8(plaintext).map_err(|e| ProtectionError::Codec(e.to_string()))
    }
}
