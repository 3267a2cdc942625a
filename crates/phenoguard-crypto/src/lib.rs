//! Cryptographic primitives for phenoguard.
//!
//! - Hybrid (ECDH P-256 + HKDF-SHA256 + AES-256-GCM) encryption bound to a context
//! - ECDSA P-256 signing with IEEE P1363 signatures
//! - Keccak-256 digests
//! - P-256 JWK import/export
//! - Canonical JSON
//!
//! Nothing here touches the filesystem; key persistence lives in the
//! `phenoguard` crate.

pub mod aes_gcm;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod hybrid;
pub mod jwk;
pub mod signing;
pub mod types;

pub use canonical::{canonical_bytes, canonical_json};
pub use digest::Digest;
pub use error::CryptoError;
pub use hybrid::{hybrid_decrypt, hybrid_encrypt};
pub use jwk::{
    export_private_jwk, export_public_jwk, generate_secret_key, import_private_jwk,
    import_public_jwk,
};
pub use signing::{sign, verify};
pub use types::{CURRENT_VERSION, DIGEST_LENGTH, SIGNATURE_LENGTH, SUPPORTED_VERSIONS};

pub use p256::{PublicKey, SecretKey};
