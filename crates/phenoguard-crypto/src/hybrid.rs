//! Context-bound hybrid encryption to a P-256 public key.
//!
//! Key agreement: ephemeral-static ECDH on P-256.
//! Key derivation: HKDF-SHA256 (IKM = shared secret, salt = ephemeral
//! public key, info = `phenoguard:hybrid:v1`).
//! Content encryption: AES-256-GCM with the caller's context as AAD.
//!
//! Wire format v1:
//! [version=1:1B][ephemeral public key, SEC1 uncompressed:65B][IV:12B][ciphertext+tag]
//!
//! The context is authenticated, not encrypted: decryption only succeeds
//! when the exact same context bytes are supplied again.

use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::aes_gcm::{open, seal};
use crate::error::CryptoError;
use crate::types::{
    AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH, CURRENT_VERSION, EPHEMERAL_KEY_LENGTH,
    HYBRID_KDF_INFO, SUPPORTED_VERSIONS,
};

/// Smallest well-formed ciphertext (empty payloads are rejected before
/// encryption, so real ciphertexts are always longer).
pub const MIN_CIPHERTEXT_LENGTH: usize =
    1 + EPHEMERAL_KEY_LENGTH + AES_GCM_IV_LENGTH + AES_GCM_TAG_LENGTH;

fn derive_key(
    shared_secret: &[u8],
    ephemeral_public: &[u8],
) -> Result<[u8; AES_KEY_LENGTH], CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(ephemeral_public), shared_secret);
    let mut okm = [0u8; AES_KEY_LENGTH];
    hk.expand(HYBRID_KDF_INFO, &mut okm)
        .map_err(|e| CryptoError::EncryptionFailed(format!("HKDF expand failed: {}", e)))?;
    Ok(okm)
}

/// Encrypt `plaintext` to `recipient`, binding the result to `context`.
pub fn hybrid_encrypt(
    recipient: &PublicKey,
    plaintext: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::EmptyInput("plaintext"));
    }
    if context.is_empty() {
        return Err(CryptoError::EmptyInput("context"));
    }

    let ephemeral_secret = EphemeralSecret::random(&mut p256::elliptic_curve::rand_core::OsRng);
    let ephemeral_point = PublicKey::from(&ephemeral_secret).to_encoded_point(false);
    let shared_secret = ephemeral_secret.diffie_hellman(recipient);

    let mut key = derive_key(
        shared_secret.raw_secret_bytes().as_slice(),
        ephemeral_point.as_bytes(),
    )?;
    let sealed = seal(&key, plaintext, context);
    key.zeroize();
    let sealed = sealed?;

    let mut result = Vec::with_capacity(1 + EPHEMERAL_KEY_LENGTH + sealed.len());
    result.push(CURRENT_VERSION);
    result.extend_from_slice(ephemeral_point.as_bytes());
    result.extend_from_slice(&sealed);
    Ok(result)
}

/// Decrypt a v1 hybrid ciphertext with the recipient's secret key.
///
/// Fails with `DecryptionFailed` if `context` differs from the one used
/// at encryption time or the ciphertext was modified.
pub fn hybrid_decrypt(
    recipient: &SecretKey,
    ciphertext: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() {
        return Err(CryptoError::EmptyInput("ciphertext"));
    }
    if context.is_empty() {
        return Err(CryptoError::EmptyInput("context"));
    }
    if ciphertext.len() < MIN_CIPHERTEXT_LENGTH {
        return Err(CryptoError::DataTooShort);
    }

    let version = ciphertext[0];
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(CryptoError::UnsupportedVersion(version));
    }

    let (ephemeral_bytes, sealed) = ciphertext[1..].split_at(EPHEMERAL_KEY_LENGTH);
    let ephemeral_public = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|e| CryptoError::InvalidEphemeralKey(e.to_string()))?;

    let shared_secret = p256::ecdh::diffie_hellman(
        recipient.to_nonzero_scalar(),
        ephemeral_public.as_affine(),
    );
    let mut key = derive_key(shared_secret.raw_secret_bytes().as_slice(), ephemeral_bytes)?;
    let plaintext = open(&key, sealed, context);
    key.zeroize();
    plaintext
}
