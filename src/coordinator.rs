//! Applies the protection services to specific parts of a record.
//!
//! This is the only module that knows which fields are protected:
//!
//! - the subject's age (`subject.timeAtLastEncounter`) and the metadata
//!   creator are encrypted in place, bound to the record id;
//! - alternatively the whole metadata block is sealed into the ciphertext
//!   store and removed from the record;
//! - the whole record is signed over its canonical bytes;
//! - diseases, phenotypic features and medical actions get per-element
//!   digests.
//!
//! Every transition is independent. Protecting again overwrites the
//! earlier result; it never encrypts a ciphertext a second time.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use phenoguard_crypto::Digest;
use tracing::{debug, info, instrument};

use crate::cipher::{CipherMode, HybridCipher};
use crate::config::{Config, StoreNames};
use crate::error::{ProtectionError, Result};
use crate::integrity::IntegrityHasher;
use crate::keystore::KeyStore;
use crate::record::{
    decode_metadata, encode, Disease, MedicalAction, MetaData, Phenopacket, PhenotypicFeature,
    RecordId, TimeElement,
};
use crate::signature::{Signature, SignatureMode, SignatureService};
use crate::store::{get_entry, put_entry, TextStore};

const METADATA_ENTRY: &str = "Metadata";

/// Plaintext values recovered from a record protected in
/// [`CipherMode::Fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedFields {
    pub age: Option<String>,
    pub creator: Option<String>,
}

/// Result of [`ProtectionCoordinator::decrypt_record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Revealed {
    Fields(RevealedFields),
    Metadata(MetaData),
}

/// Result of [`ProtectionCoordinator::apply_signature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    Signed(Signature),
    Verified(bool),
}

pub struct ProtectionCoordinator {
    keys: Arc<KeyStore>,
    cipher: HybridCipher,
    signatures: SignatureService,
    hasher: IntegrityHasher,
    store: Arc<dyn TextStore>,
    ciphertext_extension: String,
    /// Entries a sealed metadata file must never land on.
    reserved: Vec<String>,
}

impl ProtectionCoordinator {
    /// Coordinator over `store` with the default entry names.
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self::from_config(store, &Config::default())
    }

    pub fn from_config(store: Arc<dyn TextStore>, config: &Config) -> Self {
        let keys = Arc::new(KeyStore::with_entries(store.clone(), config.keys.clone()));
        Self::with_parts(keys, store, &config.stores)
    }

    /// Build from an existing key store, e.g. one shared with other
    /// components.
    pub fn with_parts(keys: Arc<KeyStore>, store: Arc<dyn TextStore>, names: &StoreNames) -> Self {
        let mut reserved: Vec<String> = keys
            .entries()
            .names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        reserved.push(names.signatures_file.clone());
        Self {
            cipher: HybridCipher::new(keys.clone()),
            signatures: SignatureService::with_names(keys.clone(), store.clone(), names),
            hasher: IntegrityHasher::with_names(store.clone(), names),
            keys,
            store,
            ciphertext_extension: names.ciphertext_extension.clone(),
            reserved,
        }
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    pub fn cipher(&self) -> &HybridCipher {
        &self.cipher
    }

    pub fn signatures(&self) -> &SignatureService {
        &self.signatures
    }

    pub fn hasher(&self) -> &IntegrityHasher {
        &self.hasher
    }

    // ========================================================================
    // Field encryption
    // ========================================================================

    /// Encrypt an age value for `record`. Returns Base64 ciphertext.
    pub fn protect_age_field(&self, record: &Phenopacket, plaintext_age: &str) -> Result<String> {
        let protected = self
            .cipher
            .encrypt_to_base64(plaintext_age, record.id.as_bytes())?;
        debug!(record_id = %record.id, "Protected age");
        Ok(protected)
    }

    pub fn reveal_age_field(&self, record: &Phenopacket, encrypted_age: &str) -> Result<String> {
        self.cipher
            .decrypt_from_base64(encrypted_age, record.id.as_bytes())
    }

    /// Copy of `metadata` with `createdBy` replaced by its ciphertext.
    /// All other fields are kept.
    pub fn protect_metadata_creator(
        &self,
        metadata: &MetaData,
        context: &RecordId,
    ) -> Result<MetaData> {
        let created_by = self
            .cipher
            .encrypt_to_base64(&metadata.created_by, context.as_bytes())?;
        debug!(record_id = %context, "Protected metadata creator");
        Ok(MetaData {
            created_by,
            ..metadata.clone()
        })
    }

    pub fn reveal_metadata_creator(&self, metadata: &MetaData, context: &RecordId) -> Result<String> {
        self.cipher
            .decrypt_from_base64(&metadata.created_by, context.as_bytes())
    }

    /// Encrypt `subject.timeAtLastEncounter` in place.
    pub fn protect_subject_age(&self, record: &Phenopacket) -> Result<Phenopacket> {
        let plaintext = subject_age(record)?;
        let protected = self.protect_age_field(record, plaintext)?;
        Ok(with_subject_age(record, protected))
    }

    pub fn reveal_subject_age(&self, record: &Phenopacket) -> Result<String> {
        self.reveal_age_field(record, subject_age(record)?)
    }

    /// Protect the subject age and the metadata creator, whichever are
    /// present and not protected yet.
    #[instrument(skip_all, fields(record_id = %record.id))]
    pub fn protect_fields(&self, record: &Phenopacket) -> Result<Phenopacket> {
        record.validate()?;
        let mut protected = record.clone();

        if let Ok(age) = subject_age(record) {
            if self.is_protected(age, &record.id) {
                debug!("Subject age already protected");
            } else {
                protected = self.protect_subject_age(&protected)?;
            }
        }
        if let Some(meta) = &record.meta_data {
            if self.is_protected(&meta.created_by, &record.id) {
                debug!("Metadata creator already protected");
            } else {
                protected.meta_data = Some(self.protect_metadata_creator(meta, &record.id)?);
            }
        }
        info!("Protected record fields");
        Ok(protected)
    }

    pub fn reveal_fields(&self, record: &Phenopacket) -> Result<RevealedFields> {
        let age = match subject_age(record) {
            Ok(age) => Some(self.reveal_age_field(record, age)?),
            Err(_) => None,
        };
        let creator = match &record.meta_data {
            Some(meta) => Some(self.reveal_metadata_creator(meta, &record.id)?),
            None => None,
        };
        Ok(RevealedFields { age, creator })
    }

    fn is_protected(&self, value: &str, context: &RecordId) -> bool {
        self.cipher
            .decrypt_from_base64(value, context.as_bytes())
            .is_ok()
    }

    // ========================================================================
    // Whole-metadata sealing
    // ========================================================================

    fn ciphertext_file(&self, id: &RecordId) -> Result<String> {
        let file = format!("{id}.{}", self.ciphertext_extension);
        if self.reserved.iter().any(|name| *name == file) {
            return Err(ProtectionError::invalid(format!(
                "record id {id:?} would seal metadata into reserved entry {file:?}"
            )));
        }
        Ok(file)
    }

    /// Encrypt the whole metadata block into the ciphertext store and
    /// return the record without it.
    #[instrument(skip_all, fields(record_id = %record.id))]
    pub fn seal_metadata(&self, record: &Phenopacket) -> Result<Phenopacket> {
        let meta = record
            .meta_data
            .as_ref()
            .ok_or_else(|| ProtectionError::invalid("record has no metadata to seal"))?;
        let file = self.ciphertext_file(&record.id)?;
        let sealed = self
            .cipher
            .encrypt(&encode(meta)?, record.id.as_bytes())?;
        let encoded = STANDARD.encode(sealed);
        put_entry(self.store.as_ref(), &file, METADATA_ENTRY, &encoded)?;
        info!("Sealed metadata block");
        Ok(Phenopacket {
            meta_data: None,
            ..record.clone()
        })
    }

    pub fn unseal_metadata(&self, record_id: &RecordId) -> Result<MetaData> {
        let file = self.ciphertext_file(record_id)?;
        let encoded = get_entry(self.store.as_ref(), &file, METADATA_ENTRY)?
            .ok_or_else(|| ProtectionError::not_found("sealed metadata", record_id.as_str()))?;
        let sealed = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProtectionError::corrupt(file.as_str(), e))?;
        let plaintext = self.cipher.decrypt(&sealed, record_id.as_bytes())?;
        decode_metadata(&plaintext)
    }

    /// Dispatch an encryption pass by mode.
    pub fn encrypt_record(&self, record: &Phenopacket, mode: CipherMode) -> Result<Phenopacket> {
        match mode {
            CipherMode::Fields => self.protect_fields(record),
            CipherMode::MetadataBlock => self.seal_metadata(record),
        }
    }

    pub fn decrypt_record(&self, record: &Phenopacket, mode: CipherMode) -> Result<Revealed> {
        match mode {
            CipherMode::Fields => self.reveal_fields(record).map(Revealed::Fields),
            CipherMode::MetadataBlock => self.unseal_metadata(&record.id).map(Revealed::Metadata),
        }
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    /// Sign the record's canonical bytes and store signature and payload
    /// under the record id.
    #[instrument(skip_all, fields(record_id = %record.id))]
    pub fn sign_record(&self, record: &Phenopacket) -> Result<Signature> {
        let payload = encode(record)?;
        let signature = self.signatures.sign(&payload)?;
        self.signatures.store(record.id.as_str(), &signature)?;
        self.signatures.store_payload(record.id.as_str(), &payload)?;
        Ok(signature)
    }

    /// Check the record against its stored signature. `NotFound` if it was
    /// never signed.
    #[instrument(skip_all, fields(record_id = %record.id))]
    pub fn verify_record(&self, record: &Phenopacket) -> Result<bool> {
        let payload = encode(record)?;
        let valid = self
            .signatures
            .verify_stored(record.id.as_str(), &payload)?;
        info!(valid, "Verified record signature");
        Ok(valid)
    }

    /// Re-verify the payload snapshot kept at signing time, without the
    /// record itself.
    pub fn verify_stored_snapshot(&self, record_id: &RecordId) -> Result<bool> {
        let payload = self.signatures.retrieve_payload(record_id.as_str())?;
        self.signatures
            .verify_stored(record_id.as_str(), &payload)
    }

    pub fn apply_signature(
        &self,
        record: &Phenopacket,
        mode: SignatureMode,
    ) -> Result<SignatureOutcome> {
        match mode {
            SignatureMode::Sign => self.sign_record(record).map(SignatureOutcome::Signed),
            SignatureMode::Verify => self.verify_record(record).map(SignatureOutcome::Verified),
        }
    }

    // ========================================================================
    // Element digests
    // ========================================================================

    pub fn hash_element(
        &self,
        record: &Phenopacket,
        element_name: &str,
        element_bytes: &[u8],
    ) -> Result<Digest> {
        let digest = self.hasher.digest(element_bytes)?;
        self.hasher
            .store_digest(record.id.as_str(), element_name, &digest)?;
        info!(record_id = %record.id, element = element_name, "Hashed element");
        Ok(digest)
    }

    /// `NotFound` if the element was never hashed.
    pub fn verify_element(
        &self,
        record: &Phenopacket,
        element_name: &str,
        element_bytes: &[u8],
    ) -> Result<bool> {
        let expected = self.hasher.load_digest(record.id.as_str(), element_name)?;
        let valid = self.hasher.check_digest(element_bytes, &expected)?;
        debug!(record_id = %record.id, element = element_name, valid, "Checked element digest");
        Ok(valid)
    }

    /// Digest a disease, named by its term label.
    pub fn hash_disease(&self, record: &Phenopacket, disease: &Disease) -> Result<Digest> {
        self.hash_element(record, disease.element_name(), &encode(disease)?)
    }

    pub fn verify_disease(&self, record: &Phenopacket, disease: &Disease) -> Result<bool> {
        self.verify_element(record, disease.element_name(), &encode(disease)?)
    }

    /// Digest a phenotypic feature, named by its type label.
    pub fn hash_phenotypic_feature(
        &self,
        record: &Phenopacket,
        feature: &PhenotypicFeature,
    ) -> Result<Digest> {
        self.hash_element(record, feature.element_name(), &encode(feature)?)
    }

    pub fn verify_phenotypic_feature(
        &self,
        record: &Phenopacket,
        feature: &PhenotypicFeature,
    ) -> Result<bool> {
        self.verify_element(record, feature.element_name(), &encode(feature)?)
    }

    /// Digest a medical action under a caller-chosen name.
    pub fn hash_medical_action(
        &self,
        record: &Phenopacket,
        element_name: &str,
        action: &MedicalAction,
    ) -> Result<Digest> {
        self.hash_element(record, element_name, &encode(action)?)
    }

    pub fn verify_medical_action(
        &self,
        record: &Phenopacket,
        element_name: &str,
        action: &MedicalAction,
    ) -> Result<bool> {
        self.verify_element(record, element_name, &encode(action)?)
    }
}

fn subject_age(record: &Phenopacket) -> Result<&str> {
    let subject = record
        .subject
        .as_ref()
        .ok_or_else(|| ProtectionError::invalid("record has no subject"))?;
    match &subject.time_at_last_encounter {
        Some(TimeElement::Age { iso8601duration }) => Ok(iso8601duration.as_str()),
        Some(other) => Err(ProtectionError::invalid(format!(
            "timeAtLastEncounter must use the age representation, got {}",
            other.kind()
        ))),
        None => Err(ProtectionError::invalid("subject has no timeAtLastEncounter")),
    }
}

fn with_subject_age(record: &Phenopacket, age: String) -> Phenopacket {
    let mut updated = record.clone();
    if let Some(subject) = updated.subject.as_mut() {
        subject.time_at_last_encounter = Some(TimeElement::age(age));
    }
    updated
}
