//! Deterministic byte form of records and their parts, and JSON
//! import/export of whole records.
//!
//! Signatures and digests are computed over canonical JSON (sorted keys,
//! no insignificant whitespace), so the same record always yields the same
//! bytes no matter how it was built or which field order a file used.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::types::{MetaData, Phenopacket, RecordId};
use crate::error::{ProtectionError, Result};
use crate::store::TextStore;

/// Canonical bytes of a record, or any part of one.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(phenoguard_crypto::canonical_bytes(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn decode_metadata(bytes: &[u8]) -> Result<MetaData> {
    decode(bytes)
}

/// Pretty JSON for files people may read.
pub fn to_json(record: &Phenopacket) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Parse and type-check a record.
pub fn from_json(text: &str) -> Result<Phenopacket> {
    let record: Phenopacket = serde_json::from_str(text)?;
    record.validate()?;
    Ok(record)
}

/// File name a record is exported under.
pub fn record_file_name(id: &RecordId) -> String {
    format!("P-{id}.json")
}

pub fn export_record(store: &dyn TextStore, record: &Phenopacket) -> Result<()> {
    record.validate()?;
    let name = record_file_name(&record.id);
    store.write_text(&name, &to_json(record)?)?;
    info!(record_id = %record.id, entry = %name, "Exported record");
    Ok(())
}

pub fn import_record(store: &dyn TextStore, id: &RecordId) -> Result<Phenopacket> {
    let name = record_file_name(id);
    let text = store
        .read_text(&name)?
        .ok_or_else(|| ProtectionError::not_found("record", id.as_str()))?;
    let record = from_json(&text)?;
    if &record.id != id {
        return Err(ProtectionError::corrupt(
            name,
            format!("file holds record {}", record.id),
        ));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample::sample_record;
    use crate::store::MemoryStore;

    #[test]
    fn encoding_is_deterministic() {
        let record = sample_record(RecordId::new("abc").unwrap());
        assert_eq!(encode(&record).unwrap(), encode(&record.clone()).unwrap());
    }

    #[test]
    fn encoding_ignores_input_key_order() {
        let a: MetaData = serde_json::from_str(
            r#"{"createdBy":"Peter R.","submittedBy":"Peter R.","phenopacketSchemaVersion":"2.0"}"#,
        )
        .unwrap();
        let b: MetaData = serde_json::from_str(
            r#"{"phenopacketSchemaVersion":"2.0","submittedBy":"Peter R.","createdBy":"Peter R."}"#,
        )
        .unwrap();
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn metadata_decodes_from_its_encoding() {
        let record = sample_record(RecordId::new("abc").unwrap());
        let meta = record.meta_data.unwrap();
        assert_eq!(decode_metadata(&encode(&meta).unwrap()).unwrap(), meta);
    }

    #[test]
    fn export_then_import() {
        let store = MemoryStore::new();
        let id = RecordId::new("abc").unwrap();
        let record = sample_record(id.clone());
        export_record(&store, &record).unwrap();
        assert!(store.exists("P-abc.json").unwrap());
        assert_eq!(import_record(&store, &id).unwrap(), record);
    }

    #[test]
    fn import_missing_is_not_found() {
        let store = MemoryStore::new();
        let id = RecordId::new("missing").unwrap();
        assert!(matches!(
            import_record(&store, &id),
            Err(ProtectionError::NotFound { kind: "record", .. })
        ));
    }

    #[test]
    fn import_rejects_wrong_time_representation() {
        let store = MemoryStore::new();
        store
            .write_text(
                "P-abc.json",
                r#"{"id":"abc","subject":{"id":"s","timeAtLastEncounter":{"timestamp":"2020-01-01T00:00:00Z"}}}"#,
            )
            .unwrap();
        let id = RecordId::new("abc").unwrap();
        assert!(matches!(
            import_record(&store, &id),
            Err(ProtectionError::InvalidInput(_))
        ));
    }

    #[test]
    fn import_rejects_mismatched_id() {
        let store = MemoryStore::new();
        store.write_text("P-abc.json", r#"{"id":"xyz"}"#).unwrap();
        assert!(matches!(
            import_record(&store, &RecordId::new("abc").unwrap()),
            Err(ProtectionError::Corrupt { .. })
        ));
    }

    #[test]
    fn import_rejects_fields_outside_the_model() {
        let store = MemoryStore::new();
        let id = RecordId::new("abc").unwrap();
        let mut value = serde_json::to_value(sample_record(id.clone())).unwrap();
        value["subject"]["sex"] = "MALE".into();
        store.write_text("P-abc.json", &value.to_string()).unwrap();
        assert!(matches!(
            import_record(&store, &id),
            Err(ProtectionError::Codec(_))
        ));
    }

    #[test]
    fn malformed_json_is_codec_error() {
        assert!(matches!(from_json("{"), Err(ProtectionError::Codec(_))));
    }
}
