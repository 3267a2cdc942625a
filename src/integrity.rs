//! Per-element content digests and their store.
//!
//! Digests for a record live in `<record id>.txt`, one
//! `<element name>:<hex digest>` line per entry. Hashing an element again
//! appends a newer line; lookups take the last line for the name.

use std::sync::Arc;

use phenoguard_crypto::Digest;
use tracing::{debug, warn};

use crate::config::StoreNames;
use crate::error::{ProtectionError, Result};
use crate::store::TextStore;

pub struct IntegrityHasher {
    store: Arc<dyn TextStore>,
    digest_extension: String,
}

impl IntegrityHasher {
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self::with_names(store, &StoreNames::default())
    }

    pub fn with_names(store: Arc<dyn TextStore>, names: &StoreNames) -> Self {
        Self {
            store,
            digest_extension: names.digest_extension.clone(),
        }
    }

    /// Keccak-256 of `payload`.
    pub fn digest(&self, payload: &[u8]) -> Result<Digest> {
        if payload.is_empty() {
            return Err(ProtectionError::invalid("payload must not be empty"));
        }
        Ok(Digest::compute(payload))
    }

    pub fn store_digest(&self, record_id: &str, element_name: &str, digest: &Digest) -> Result<()> {
        check_element_name(element_name)?;
        let file = self.digest_file(record_id)?;
        self.store
            .append_line(&file, &format!("{element_name}:{}", digest.to_hex()))?;
        debug!(record_id, element = element_name, "Stored digest");
        Ok(())
    }

    /// Most recently stored digest for `element_name`.
    pub fn load_digest(&self, record_id: &str, element_name: &str) -> Result<Digest> {
        check_element_name(element_name)?;
        let file = self.digest_file(record_id)?;
        let not_found = || ProtectionError::not_found("digest", format!("{record_id}/{element_name}"));

        let text = self.store.read_text(&file)?.ok_or_else(not_found)?;
        // Element names may themselves contain ':', so split on the last one.
        let hex = text
            .lines()
            .filter_map(|line| line.rsplit_once(':'))
            .filter(|(name, _)| *name == element_name)
            .map(|(_, hex)| hex)
            .last()
            .ok_or_else(not_found)?;

        Digest::from_hex(hex).map_err(|e| ProtectionError::corrupt(file.as_str(), e))
    }

    /// Constant-time comparison of `digest(payload)` with `expected`.
    pub fn check_digest(&self, payload: &[u8], expected: &Digest) -> Result<bool> {
        let matches = self.digest(payload)?.ct_eq(expected);
        if !matches {
            warn!("Digest mismatch");
        }
        Ok(matches)
    }

    fn digest_file(&self, record_id: &str) -> Result<String> {
        if record_id.is_empty() {
            return Err(ProtectionError::invalid("record id must not be empty"));
        }
        Ok(format!("{record_id}.{}", self.digest_extension))
    }
}

fn check_element_name(element_name: &str) -> Result<()> {
    if element_name.is_empty() {
        return Err(ProtectionError::invalid("element name must not be empty"));
    }
    if element_name.contains(['\n', '\r']) {
        return Err(ProtectionError::invalid(format!(
            "element name {element_name:?} contains a line break"
        )));
    }
    Ok(())
}
