//! AES-256-GCM sealing with associated data.
//!
//! Output layout: [IV:12][ciphertext + tag:16]. Framing (version byte,
//! ephemeral key) is added by the caller.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::CryptoError;
use crate::types::{AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH};

/// Generate a random 12-byte IV for AES-GCM.
pub fn generate_iv() -> Result<[u8; AES_GCM_IV_LENGTH], CryptoError> {
    let mut iv = [0u8; AES_GCM_IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(iv)
}

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != AES_KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: AES_KEY_LENGTH,
            got: key.len(),
        });
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Encrypt `plaintext` under `key`, authenticating `aad`.
///
/// Returns `[IV:12][ciphertext+tag]`.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key)?;
    let iv = generate_iv()?;
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(AES_GCM_IV_LENGTH + ciphertext.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt `[IV:12][ciphertext+tag]` under `key`; fails unless `aad`
/// matches the value used when sealing.
pub fn open(key: &[u8], data: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < AES_GCM_IV_LENGTH + AES_GCM_TAG_LENGTH {
        return Err(CryptoError::DataTooShort);
    }
    let cipher = cipher_for(key)?;
    let (iv, ciphertext) = data.split_at(AES_GCM_IV_LENGTH);
    let nonce = Nonce::from_slice(iv);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
