//! P-256 keys in JWK (RFC 7517) form.
//!
//! Both the hybrid encryption keypair and the signing keypair are plain
//! P-256 keys, so one import/export path serves both.

use base64ct::{Base64UrlUnpadded, Encoding};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use serde_json::Value;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::types::EPHEMERAL_KEY_LENGTH;

const COORDINATE_LENGTH: usize = 32;

/// Generate a new random P-256 secret key.
pub fn generate_secret_key() -> SecretKey {
    SecretKey::random(&mut p256::elliptic_curve::rand_core::OsRng)
}

/// Uncompressed SEC1 coordinates of a public key, base64url encoded.
fn coordinates(key: &PublicKey) -> (String, String) {
    let point = key.to_encoded_point(false);
    // Uncompressed SEC1: 0x04 || x || y
    let bytes = point.as_bytes();
    let x = &bytes[1..1 + COORDINATE_LENGTH];
    let y = &bytes[1 + COORDINATE_LENGTH..EPHEMERAL_KEY_LENGTH];
    (
        Base64UrlUnpadded::encode_string(x),
        Base64UrlUnpadded::encode_string(y),
    )
}

/// Export a P-256 public key to JWK format.
pub fn export_public_jwk(key: &PublicKey) -> Value {
    let (x, y) = coordinates(key);
    serde_json::json!({
        "kty": "EC",
        "crv": "P-256",
        "x": x,
        "y": y,
    })
}

/// Export a P-256 secret key (with its public coordinates) to JWK format.
pub fn export_private_jwk(key: &SecretKey) -> Value {
    let (x, y) = coordinates(&key.public_key());
    let mut scalar_bytes = key.to_bytes().to_vec();
    let d = Base64UrlUnpadded::encode_string(&scalar_bytes);
    scalar_bytes.zeroize();

    serde_json::json!({
        "kty": "EC",
        "crv": "P-256",
        "x": x,
        "y": y,
        "d": d,
    })
}

fn require_ec_p256(jwk: &Value) -> Result<(), CryptoError> {
    let kty = jwk
        .get("kty")
        .and_then(Value::as_str)
        .ok_or(CryptoError::MissingJwkField("kty"))?;
    if kty != "EC" {
        return Err(CryptoError::InvalidJwk(format!("kty: expected EC, got {kty}")));
    }
    let crv = jwk
        .get("crv")
        .and_then(Value::as_str)
        .ok_or(CryptoError::MissingJwkField("crv"))?;
    if crv != "P-256" {
        return Err(CryptoError::InvalidJwk(format!(
            "crv: expected P-256, got {crv}"
        )));
    }
    Ok(())
}

fn decode_field(jwk: &Value, field: &'static str) -> Result<Vec<u8>, CryptoError> {
    let encoded = jwk
        .get(field)
        .and_then(Value::as_str)
        .ok_or(CryptoError::MissingJwkField(field))?;
    Base64UrlUnpadded::decode_vec(encoded)
        .map_err(|e| CryptoError::InvalidJwk(format!("{field}: {e}")))
}

/// Import a P-256 public key from JWK format.
pub fn import_public_jwk(jwk: &Value) -> Result<PublicKey, CryptoError> {
    require_ec_p256(jwk)?;
    let x_bytes = decode_field(jwk, "x")?;
    let y_bytes = decode_field(jwk, "y")?;
    if x_bytes.len() > COORDINATE_LENGTH || y_bytes.len() > COORDINATE_LENGTH {
        return Err(CryptoError::InvalidJwk("coordinate longer than 32 bytes".into()));
    }

    // Left-pad coordinates: JWKs may omit leading zeros.
    let mut uncompressed = Vec::with_capacity(EPHEMERAL_KEY_LENGTH);
    uncompressed.push(0x04);
    uncompressed.resize(1 + COORDINATE_LENGTH - x_bytes.len(), 0);
    uncompressed.extend_from_slice(&x_bytes);
    uncompressed.resize(EPHEMERAL_KEY_LENGTH - y_bytes.len(), 0);
    uncompressed.extend_from_slice(&y_bytes);

    PublicKey::from_sec1_bytes(&uncompressed)
        .map_err(|e| CryptoError::InvalidJwk(format!("P-256 point: {e}")))
}

/// Import a P-256 secret key from JWK format.
///
/// When the JWK also carries `x`/`y`, they must match the public key
/// derived from `d`.
pub fn import_private_jwk(jwk: &Value) -> Result<SecretKey, CryptoError> {
    require_ec_p256(jwk)?;
    let mut d_bytes = decode_field(jwk, "d")?;
    let secret = SecretKey::from_slice(&d_bytes)
        .map_err(|e| CryptoError::InvalidJwk(format!("P-256 scalar: {e}")));
    d_bytes.zeroize();
    let secret = secret?;

    if jwk.get("x").is_some() || jwk.get("y").is_some() {
        let declared = import_public_jwk(jwk)?;
        if declared != secret.public_key() {
            return Err(CryptoError::InvalidJwk(
                "public coordinates do not match private scalar".into(),
            ));
        }
    }
    Ok(secret)
}
