/// Wire format version for hybrid ciphertexts.
///
/// Version 1: ECDH P-256 + HKDF-SHA256 + AES-256-GCM
/// Format: [version=1:1B][ephemeral public key:65B][IV:12B][ciphertext+tag]
pub const CURRENT_VERSION: u8 = 1;

/// Supported wire format versions (for decryption).
pub const SUPPORTED_VERSIONS: &[u8] = &[1];

/// AES-GCM IV length in bytes (96 bits per NIST recommendation).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES-GCM tag length in bytes (128 bits).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// AES key length in bytes (256 bits).
pub const AES_KEY_LENGTH: usize = 32;

/// SEC1 uncompressed P-256 point: 0x04 || x(32) || y(32).
pub const EPHEMERAL_KEY_LENGTH: usize = 65;

/// IEEE P1363 ECDSA P-256 signature (r||s).
pub const SIGNATURE_LENGTH: usize = 64;

/// Keccak-256 output length.
pub const DIGEST_LENGTH: usize = 32;

/// HKDF info string for hybrid key derivation.
pub const HYBRID_KDF_INFO: &[u8] = b"phenoguard:hybrid:v1";
