use phenoguard_crypto::CryptoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtectionError>;

/// Failure taxonomy of the protection subsystem.
///
/// A signature or digest that does not match is a normal outcome and is
/// returned as `false` by the services; `VerificationFailed` exists for
/// callers (the CLI) that need to turn that outcome into an error.
#[derive(Debug, Error)]
pub enum ProtectionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Key material unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Authentication failed: ciphertext does not match its context or was modified")]
    AuthenticationFailure,

    #[error("Verification failed for {0}")]
    VerificationFailed(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Corrupt entry {name}: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("Storage error on {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Record codec error: {0}")]
    Codec(String),

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),
}

impl ProtectionError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn storage(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            name: name.into(),
            source,
        }
    }

    pub(crate) fn corrupt(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<CryptoError> for ProtectionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EmptyInput(what) => Self::InvalidInput(format!("{what} must not be empty")),
            CryptoError::DataTooShort
            | CryptoError::UnsupportedVersion(_)
            | CryptoError::InvalidEphemeralKey(_)
            | CryptoError::DecryptionFailed(_) => Self::AuthenticationFailure,
            CryptoError::MissingJwkField(_) | CryptoError::InvalidJwk(_) => {
                Self::KeyUnavailable(err.to_string())
            }
            CryptoError::SerializationError(_) | CryptoError::NonFiniteNumber => {
                Self::Codec(err.to_string())
            }
            other => Self::Crypto(other),
        }
    }
}

impl From<serde_json::Error> for ProtectionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failures_map_to_authentication_failure() {
        for err in [
            CryptoError::DataTooShort,
            CryptoError::UnsupportedVersion(7),
            CryptoError::InvalidEphemeralKey("bad point".into()),
            CryptoError::DecryptionFailed("aead::Error".into()),
        ] {
            assert!(matches!(
                ProtectionError::from(err),
                ProtectionError::AuthenticationFailure
            ));
        }
    }

    #[test]
    fn jwk_failures_map_to_key_unavailable() {
        assert!(matches!(
            ProtectionError::from(CryptoError::MissingJwkField("d")),
            ProtectionError::KeyUnavailable(_)
        ));
    }

    #[test]
    fn empty_input_maps_to_invalid_input() {
        let err = ProtectionError::from(CryptoError::EmptyInput("context"));
        assert_eq!(err.to_string(), "Invalid input: context must not be empty");
    }

    #[test]
    fn rng_failure_stays_a_crypto_error() {
        assert!(matches!(
            ProtectionError::from(CryptoError::RngFailed("no entropy".into())),
            ProtectionError::Crypto(_)
        ));
    }
}
