//! Whole-record signatures and the signature store.
//!
//! The store is a single JSON object. For a record id `abc` it holds
//! `"abc-Signature"` (the Base64 signature) and, optionally, `"abc-Payload"`
//! (the Base64 of the exact bytes that were signed), so a record can be
//! re-verified from the store alone. Keys of one record never collide with
//! keys of another, whatever the ids.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info};

use crate::config::StoreNames;
use crate::error::{ProtectionError, Result};
use crate::keystore::KeyStore;
use crate::store::{get_entry, put_entry, TextStore};

const SIGNATURE_SUFFIX: &str = "-Signature";
const PAYLOAD_SUFFIX: &str = "-Payload";

/// Direction of a signature pass over a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode {
    /// Sign the record and store the signature.
    Sign,
    /// Retrieve the stored signature and check it against the record.
    Verify,
}

/// A detached ECDSA P-256 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        STANDARD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| ProtectionError::invalid(format!("signature is not valid Base64: {e}")))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base64())
    }
}

pub struct SignatureService {
    keys: Arc<KeyStore>,
    store: Arc<dyn TextStore>,
    signatures_file: String,
}

impl SignatureService {
    pub fn new(keys: Arc<KeyStore>, store: Arc<dyn TextStore>) -> Self {
        Self::with_names(keys, store, &StoreNames::default())
    }

    pub fn with_names(keys: Arc<KeyStore>, store: Arc<dyn TextStore>, names: &StoreNames) -> Self {
        Self {
            keys,
            store,
            signatures_file: names.signatures_file.clone(),
        }
    }

    pub fn sign(&self, payload: &[u8]) -> Result<Signature> {
        if payload.is_empty() {
            return Err(ProtectionError::invalid("payload must not be empty"));
        }
        let pair = self.keys.signing_key_pair()?;
        let bytes = phenoguard_crypto::sign(pair.secret_key(), payload)?;
        Ok(Signature(bytes))
    }

    /// `true` only if `signature` was made over exactly `payload` with the
    /// store's signing key. A mismatch or malformed signature is `false`,
    /// not an error.
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> Result<bool> {
        if payload.is_empty() {
            return Err(ProtectionError::invalid("payload must not be empty"));
        }
        let pair = self.keys.signing_key_pair()?;
        Ok(phenoguard_crypto::verify(
            pair.public_key(),
            payload,
            signature.as_bytes(),
        ))
    }

    /// Store (or replace) the signature for `record_id`.
    pub fn store(&self, record_id: &str, signature: &Signature) -> Result<()> {
        let key = entry_key(record_id, SIGNATURE_SUFFIX)?;
        put_entry(
            self.store.as_ref(),
            &self.signatures_file,
            &key,
            &signature.to_base64(),
        )?;
        info!(record_id, "Stored signature");
        Ok(())
    }

    pub fn retrieve(&self, record_id: &str) -> Result<Signature> {
        let key = entry_key(record_id, SIGNATURE_SUFFIX)?;
        let encoded = get_entry(self.store.as_ref(), &self.signatures_file, &key)?
            .ok_or_else(|| ProtectionError::not_found("signature", record_id))?;
        Signature::from_base64(&encoded)
            .map_err(|e| ProtectionError::corrupt(self.signatures_file.as_str(), e))
    }

    /// Keep a copy of the signed bytes next to the signature.
    pub fn store_payload(&self, record_id: &str, payload: &[u8]) -> Result<()> {
        let key = entry_key(record_id, PAYLOAD_SUFFIX)?;
        put_entry(
            self.store.as_ref(),
            &self.signatures_file,
            &key,
            &STANDARD.encode(payload),
        )?;
        debug!(record_id, bytes = payload.len(), "Stored signed payload");
        Ok(())
    }

    pub fn retrieve_payload(&self, record_id: &str) -> Result<Vec<u8>> {
        let key = entry_key(record_id, PAYLOAD_SUFFIX)?;
        let encoded = get_entry(self.store.as_ref(), &self.signatures_file, &key)?
            .ok_or_else(|| ProtectionError::not_found("signed payload", record_id))?;
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProtectionError::corrupt(self.signatures_file.as_str(), e))
    }

    /// Retrieve the stored signature for `record_id` and verify `payload`.
    pub fn verify_stored(&self, record_id: &str, payload: &[u8]) -> Result<bool> {
        let signature = self.retrieve(record_id)?;
        let valid = self.verify(payload, &signature)?;
        debug!(record_id, valid, "Verified against stored signature");
        Ok(valid)
    }
}

impl fmt::Debug for SignatureService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureService")
            .field("signatures_file", &self.signatures_file)
            .finish_non_exhaustive()
    }
}

fn entry_key(record_id: &str, suffix: &str) -> Result<String> {
    if record_id.is_empty() {
        return Err(ProtectionError::invalid("record id must not be empty"));
    }
    Ok(format!("{record_id}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (Arc<MemoryStore>, SignatureService) {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyStore::new(store.clone()));
        (store.clone(), SignatureService::new(keys, store))
    }

    #[test]
    fn sign_then_verify() {
        let (_store, sigs) = service();
        let signature = sigs.sign(b"record bytes").unwrap();
        assert!(sigs.verify(b"record bytes", &signature).unwrap());
    }

    #[test]
    fn mutated_payload_does_not_verify() {
        let (_store, sigs) = service();
        let signature = sigs.sign(b"record bytes").unwrap();
        assert!(!sigs.verify(b"record bytez", &signature).unwrap());
    }

    #[test]
    fn garbage_signature_is_false_not_error() {
        let (_store, sigs) = service();
        let garbage = Signature::from_bytes(vec![0xAB; 7]);
        assert!(!sigs.verify(b"record bytes", &garbage).unwrap());
    }

    #[test]
    fn empty_payload_is_invalid() {
        let (_store, sigs) = service();
        assert!(matches!(sigs.sign(b""), Err(ProtectionError::InvalidInput(_))));
    }

    #[test]
    fn store_then_retrieve() {
        let (store, sigs) = service();
        let signature = sigs.sign(b"payload").unwrap();
        sigs.store("abc", &signature).unwrap();
        assert_eq!(sigs.retrieve("abc").unwrap(), signature);

        let file: serde_json::Value =
            serde_json::from_str(&store.read_text("signatures.json").unwrap().unwrap()).unwrap();
        assert_eq!(file["abc-Signature"], signature.to_base64());
    }

    #[test]
    fn re_signing_overwrites() {
        let (_store, sigs) = service();
        let first = sigs.sign(b"v1").unwrap();
        let second = sigs.sign(b"v2").unwrap();
        sigs.store("abc", &first).unwrap();
        sigs.store("abc", &second).unwrap();
        assert_eq!(sigs.retrieve("abc").unwrap(), second);
    }

    #[test]
    fn retrieve_missing_is_not_found() {
        let (_store, sigs) = service();
        assert!(matches!(
            sigs.retrieve("nope"),
            Err(ProtectionError::NotFound { kind: "signature", .. })
        ));
    }

    #[test]
    fn corrupt_entry_is_reported() {
        let (store, sigs) = service();
        store
            .write_text("signatures.json", r#"{"abc-Signature": "%%%"}"#)
            .unwrap();
        assert!(matches!(
            sigs.retrieve("abc"),
            Err(ProtectionError::Corrupt { .. })
        ));
    }

    #[test]
    fn payload_snapshot_round_trip() {
        let (store, sigs) = service();
        sigs.store_payload("abc", b"snapshot").unwrap();
        assert_eq!(sigs.retrieve_payload("abc").unwrap(), b"snapshot");

        let file: serde_json::Value =
            serde_json::from_str(&store.read_text("signatures.json").unwrap().unwrap()).unwrap();
        assert_eq!(file["abc-Payload"], STANDARD.encode(b"snapshot"));
    }

    #[test]
    fn suffixed_record_ids_do_not_clobber_other_records() {
        let (_store, sigs) = service();
        let signature = sigs.sign(b"abc bytes").unwrap();
        sigs.store("abc", &signature).unwrap();
        sigs.store_payload("abc", b"abc bytes").unwrap();

        for id in ["abc-Signature", "abc-Payload"] {
            let other = sigs.sign(id.as_bytes()).unwrap();
            sigs.store(id, &other).unwrap();
            sigs.store_payload(id, id.as_bytes()).unwrap();
        }

        assert_eq!(sigs.retrieve("abc").unwrap(), signature);
        assert_eq!(sigs.retrieve_payload("abc").unwrap(), b"abc bytes");
        assert!(sigs.verify_stored("abc", b"abc bytes").unwrap());
    }

    #[test]
    fn verify_stored_uses_persisted_signature() {
        let (store, sigs) = service();
        let signature = sigs.sign(b"payload").unwrap();
        sigs.store("abc", &signature).unwrap();

        let reloaded = SignatureService::new(Arc::new(KeyStore::new(store.clone())), store);
        assert!(reloaded.verify_stored("abc", b"payload").unwrap());
        assert!(!reloaded.verify_stored("abc", b"pAyload").unwrap());
    }

    #[test]
    fn signatures_for_different_records_coexist() {
        let (_store, sigs) = service();
        let a = sigs.sign(b"a").unwrap();
        let b = sigs.sign(b"b").unwrap();
        sigs.store("rec-a", &a).unwrap();
        sigs.store("rec-b", &b).unwrap();
        assert_eq!(sigs.retrieve("rec-a").unwrap(), a);
        assert_eq!(sigs.retrieve("rec-b").unwrap(), b);
    }
}
