//! ECDSA P-256 signing and verification primitives.
//!
//! Produces IEEE P1363 format signatures (raw r||s, 64 bytes).

use ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};

use crate::error::CryptoError;

/// Sign a message with ECDSA P-256 + SHA-256.
///
/// # Arguments
/// * `private_key` - P-256 secret key
/// * `message` - Message bytes to sign
///
/// # Returns
/// 64-byte IEEE P1363 signature (r||s)
pub fn sign(private_key: &SecretKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signing_key = SigningKey::from_bytes(&private_key.to_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    let signature: Signature = signing_key
        .try_sign(message)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify an ECDSA P-256 + SHA-256 signature.
///
/// Returns true if valid, false otherwise (never errors on an invalid or
/// malformed signature).
pub fn verify(public_key: &PublicKey, message: &[u8], signature_bytes: &[u8]) -> bool {
    let point = public_key.to_encoded_point(false);
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(point.as_bytes()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature_bytes) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}
