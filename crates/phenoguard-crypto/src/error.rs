use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Empty input: {0} must not be empty")]
    EmptyInput(&'static str),

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Encrypted data too short")]
    DataTooShort,

    #[error("Unsupported ciphertext version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid ephemeral public key: {0}")]
    InvalidEphemeralKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("JWK missing {0}")]
    MissingJwkField(&'static str),

    #[error("Invalid JWK: {0}")]
    InvalidJwk(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("canonicalJSON: non-finite number is not representable in JSON")]
    NonFiniteNumber,

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}
