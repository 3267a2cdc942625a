//! Keccak-256 content digests.
//!
//! This is the original Keccak padding (as used by Ethereum), not FIPS
//! SHA3-256. Digests are stored as lowercase hex.

use std::fmt;

use p256::elliptic_curve::subtle::ConstantTimeEq;
use sha3::{Digest as _, Keccak256};

use crate::error::CryptoError;
use crate::types::DIGEST_LENGTH;

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Digest {
    /// Hash `data` with Keccak-256.
    pub fn compute(data: &[u8]) -> Self {
        Self(Keccak256::digest(data).into())
    }

    pub fn from_bytes(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::InvalidDigest(e.to_string()))?;
        let array: [u8; DIGEST_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidDigest(format!("expected {DIGEST_LENGTH} bytes, got {}", b.len()))
        })?;
        Ok(Self(array))
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &Digest) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_empty_vector() {
        // Keccak-256("") differs from SHA3-256("").
        assert_eq!(
            Digest::compute(b"").to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak256_abc_vector() {
        assert_eq!(
            Digest::compute(b"abc").to_hex(),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            Digest::compute(b"Diabetes Mellitus"),
            Digest::compute(b"Diabetes Mellitus")
        );
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(
            Digest::compute(b"Diabetes Mellitus"),
            Digest::compute(b"Cardiomyopathy")
        );
    }

    #[test]
    fn hex_round_trip() {
        let d = Digest::compute(b"record");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
    }

    #[test]
    fn rejects_short_hex() {
        assert!(matches!(
            Digest::from_hex("abcd"),
            Err(CryptoError::InvalidDigest(_))
        ));
        assert!(Digest::from_hex("zz").is_err());
    }

    #[test]
    fn ct_eq_matches_eq() {
        let a = Digest::compute(b"a");
        let b = Digest::compute(b"b");
        assert!(a.ct_eq(&a));
        assert!(!a.ct_eq(&b));
    }
}
