//! Persistent P-256 key material for encryption and signing.
//!
//! Two independent keypairs are managed: one for hybrid encryption and one
//! for signatures. Each is stored as a private JWK entry and a public JWK
//! entry. The first caller to need a pair generates it; later callers (in
//! this or another process) load the persisted one.
//!
//! The private entry is the commit point. It is created with
//! create-if-absent semantics, so two processes racing to provision keys
//! agree on a single key: the loser discards its freshly generated key and
//! loads the winner's. The public entry is always derivable from the
//! private one and is rewritten when missing.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use phenoguard_crypto::{
    export_private_jwk, export_public_jwk, generate_secret_key, import_private_jwk,
    import_public_jwk, PublicKey, SecretKey,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::KeyEntries;
use crate::error::{ProtectionError, Result};
use crate::store::TextStore;

// ============================================================================
// Key pairs
// ============================================================================

#[derive(Clone)]
struct KeyMaterial {
    secret: SecretKey,
    public: PublicKey,
}

/// Keypair used by the hybrid cipher. The secret half never leaves the crate.
#[derive(Clone)]
pub struct EncryptionKeyPair(KeyMaterial);

/// Keypair used by the signature service.
#[derive(Clone)]
pub struct SigningKeyPair(KeyMaterial);

macro_rules! key_pair_accessors {
    ($ty:ident, $label:literal) => {
        impl $ty {
            pub fn public_key(&self) -> &PublicKey {
                &self.0.public
            }

            /// Public half as a JWK (`kty`, `crv`, `x`, `y`).
            pub fn public_jwk(&self) -> Value {
                export_public_jwk(&self.0.public)
            }

            pub(crate) fn secret_key(&self) -> &SecretKey {
                &self.0.secret
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct($label)
                    .field("public", &self.public_jwk())
                    .field("secret", &"<redacted>")
                    .finish()
            }
        }
    };
}

key_pair_accessors!(EncryptionKeyPair, "EncryptionKeyPair");
key_pair_accessors!(SigningKeyPair, "SigningKeyPair");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPurpose {
    Encryption,
    Signing,
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encryption => f.write_str("encryption"),
            Self::Signing => f.write_str("signing"),
        }
    }
}

// ============================================================================
// KeyStore
// ============================================================================

#[derive(Default)]
struct KeyCache {
    encryption: Option<EncryptionKeyPair>,
    signing: Option<SigningKeyPair>,
}

/// Lazily provisioned, persisted key material.
///
/// Loaded pairs are cached for the lifetime of the instance. The cache is
/// not refreshed if the entries change on disk afterwards.
pub struct KeyStore {
    store: Arc<dyn TextStore>,
    entries: KeyEntries,
    cache: Mutex<KeyCache>,
}

impl KeyStore {
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self::with_entries(store, KeyEntries::default())
    }

    pub fn with_entries(store: Arc<dyn TextStore>, entries: KeyEntries) -> Self {
        Self {
            store,
            entries,
            cache: Mutex::new(KeyCache::default()),
        }
    }

    pub fn entries(&self) -> &KeyEntries {
        &self.entries
    }

    /// The encryption keypair, generated and persisted on first use.
    pub fn encryption_key_pair(&self) -> Result<EncryptionKeyPair> {
        let mut cache = self.cache.lock();
        if let Some(pair) = &cache.encryption {
            return Ok(pair.clone());
        }
        let pair = EncryptionKeyPair(self.load_or_create(KeyPurpose::Encryption)?);
        cache.encryption = Some(pair.clone());
        Ok(pair)
    }

    /// The signing keypair, generated and persisted on first use.
    pub fn signing_key_pair(&self) -> Result<SigningKeyPair> {
        let mut cache = self.cache.lock();
        if let Some(pair) = &cache.signing {
            return Ok(pair.clone());
        }
        let pair = SigningKeyPair(self.load_or_create(KeyPurpose::Signing)?);
        cache.signing = Some(pair.clone());
        Ok(pair)
    }

    /// Provision both pairs. Safe to call any number of times.
    pub fn ensure_keys(&self) -> Result<()> {
        self.encryption_key_pair()?;
        self.signing_key_pair()?;
        Ok(())
    }

    fn entry_names(&self, purpose: KeyPurpose) -> (&str, &str) {
        let entries = &self.entries;
        match purpose {
            KeyPurpose::Encryption => (
                entries.encryption_private.as_str(),
                entries.encryption_public.as_str(),
            ),
            KeyPurpose::Signing => (
                entries.signing_private.as_str(),
                entries.signing_public.as_str(),
            ),
        }
    }

    fn load_or_create(&self, purpose: KeyPurpose) -> Result<KeyMaterial> {
        let (private_name, public_name) = self.entry_names(purpose);

        let secret = match self.store.read_text(private_name)? {
            Some(text) => {
                debug!(%purpose, entry = private_name, "Loading key");
                parse_private(private_name, &text)?
            }
            None => self.create_private(purpose, private_name)?,
        };
        let public = secret.public_key();

        match self.store.read_text(public_name)? {
            Some(text) => {
                let stored = parse_public(public_name, &text)?;
                if stored != public {
                    return Err(ProtectionError::KeyUnavailable(format!(
                        "{public_name} does not match {private_name}"
                    )));
                }
            }
            None => {
                let jwk = serde_json::to_string_pretty(&export_public_jwk(&public))?;
                self.store.write_text(public_name, &jwk)?;
                debug!(%purpose, entry = public_name, "Wrote public key");
            }
        }

        Ok(KeyMaterial { secret, public })
    }

    fn create_private(&self, purpose: KeyPurpose, name: &str) -> Result<SecretKey> {
        let secret = generate_secret_key();
        let jwk = serde_json::to_string_pretty(&export_private_jwk(&secret))?;

        if self.store.create_new(name, &jwk)? {
            info!(%purpose, entry = name, "Generated new key pair");
            return Ok(secret);
        }

        warn!(%purpose, entry = name, "Key created concurrently, loading existing key");
        let text = self.store.read_text(name)?.ok_or_else(|| {
            ProtectionError::KeyUnavailable(format!("{name} vanished after concurrent creation"))
        })?;
        parse_private(name, &text)
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

fn parse_jwk(name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| ProtectionError::KeyUnavailable(format!("{name}: {e}")))
}

fn parse_private(name: &str, text: &str) -> Result<SecretKey> {
    import_private_jwk(&parse_jwk(name, text)?)
        .map_err(|e| ProtectionError::KeyUnavailable(format!("{name}: {e}")))
}

fn parse_public(name: &str, text: &str) -> Result<PublicKey> {
    import_public_jwk(&parse_jwk(name, text)?)
        .map_err(|e| ProtectionError::KeyUnavailable(format!("{name}: {e}")))
}
