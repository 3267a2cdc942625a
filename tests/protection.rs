//! End-to-end protection flows over an on-disk store.

use std::sync::Arc;

use phenoguard::record::{encode, export_record, import_record, sample_record};
use phenoguard::{
    CipherMode, FileStore, HybridCipher, IntegrityHasher, KeyStore, Phenopacket,
    ProtectionCoordinator, ProtectionError, RecordId, SignatureService, TextStore,
};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn open_store(dir: &TempDir) -> Arc<FileStore> {
    Arc::new(FileStore::open(dir.path()).expect("open file store"))
}

/// A coordinator as a fresh process would build it.
fn fresh_coordinator(dir: &TempDir) -> ProtectionCoordinator {
    ProtectionCoordinator::new(open_store(dir))
}

fn record(id: &str) -> Phenopacket {
    sample_record(RecordId::new(id).expect("valid id"))
}

// ============================================================================
// Field encryption
// ============================================================================

#[test]
fn age_round_trip_and_context_binding() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let cipher = HybridCipher::new(Arc::new(KeyStore::new(store)));

    let ct = cipher.encrypt(b"P70Y", b"record-123").unwrap();
    assert_eq!(cipher.decrypt(&ct, b"record-123").unwrap(), b"P70Y");
    assert!(matches!(
        cipher.decrypt(&ct, b"record-456"),
        Err(ProtectionError::AuthenticationFailure)
    ));
}

#[test]
fn every_single_byte_flip_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cipher = HybridCipher::new(Arc::new(KeyStore::new(open_store(&dir))));
    let ct = cipher.encrypt(b"P70Y", b"abc").unwrap();

    for i in 0..ct.len() {
        let mut tampered = ct.clone();
        tampered[i] ^= 0x01;
        assert!(
            cipher.decrypt(&tampered, b"abc").is_err(),
            "flip at byte {i} was accepted"
        );
    }
}

#[test]
fn protected_fields_survive_export_and_new_process() {
    let dir = TempDir::new().unwrap();
    let rec = record("abc");

    {
        let store = open_store(&dir);
        let pc = ProtectionCoordinator::new(store.clone());
        let protected = pc.encrypt_record(&rec, CipherMode::Fields).unwrap();
        export_record(store.as_ref(), &protected).unwrap();
    }

    let store = open_store(&dir);
    let on_disk = store.read_text("P-abc.json").unwrap().unwrap();
    assert!(!on_disk.contains("P70Y"));
    assert!(!on_disk.contains("\"createdBy\": \"Peter R.\""));

    let pc = ProtectionCoordinator::new(store.clone());
    let loaded = import_record(store.as_ref(), &rec.id).unwrap();
    let revealed = pc.reveal_fields(&loaded).unwrap();
    assert_eq!(revealed.age.as_deref(), Some("P70Y"));
    assert_eq!(revealed.creator.as_deref(), Some("Peter R."));
}

#[test]
fn metadata_block_sealing_across_processes() {
    let dir = TempDir::new().unwrap();
    let rec = record("abc");
    let sealed = fresh_coordinator(&dir).seal_metadata(&rec).unwrap();
    assert!(sealed.meta_data.is_none());

    let meta = fresh_coordinator(&dir).unseal_metadata(&rec.id).unwrap();
    assert_eq!(Some(meta), rec.meta_data);
}

// ============================================================================
// Signatures
// ============================================================================

#[test]
fn signing_record_abc_then_reloading() {
    let dir = TempDir::new().unwrap();
    let rec = record("abc");
    let payload = encode(&rec).unwrap();

    {
        let store = open_store(&dir);
        let keys = Arc::new(KeyStore::new(store.clone()));
        let sigs = SignatureService::new(keys, store);
        let signature = sigs.sign(&payload).unwrap();
        sigs.store("abc", &signature).unwrap();
    }

    let store = open_store(&dir);
    let sigs = SignatureService::new(Arc::new(KeyStore::new(store.clone())), store);
    let signature = sigs.retrieve("abc").unwrap();
    assert!(sigs.verify(&payload, &signature).unwrap());

    let mut mutated = payload.clone();
    mutated[0] ^= 0x01;
    assert!(!sigs.verify(&mutated, &signature).unwrap());
}

#[test]
fn record_signature_detects_field_change() {
    let dir = TempDir::new().unwrap();
    let rec = record("abc");
    fresh_coordinator(&dir).sign_record(&rec).unwrap();

    let pc = fresh_coordinator(&dir);
    assert!(pc.verify_record(&rec).unwrap());

    let mut changed = rec.clone();
    changed.phenotypic_features[0].feature_type.label = "Myalgias".into();
    assert!(!pc.verify_record(&changed).unwrap());
}

#[test]
fn signing_a_protected_record_verifies_after_reload() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let pc = ProtectionCoordinator::new(store.clone());
    let protected = pc.protect_fields(&record("abc")).unwrap();
    pc.sign_record(&protected).unwrap();
    export_record(store.as_ref(), &protected).unwrap();

    let reloaded = import_record(store.as_ref(), &protected.id).unwrap();
    assert!(fresh_coordinator(&dir).verify_record(&reloaded).unwrap());
}

#[test]
fn fields_outside_the_signed_form_are_refused_on_import() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let rec = record("abc");
    fresh_coordinator(&dir).sign_record(&rec).unwrap();

    let mut value = serde_json::to_value(&rec).unwrap();
    value["subject"]["sex"] = "FEMALE".into();
    value["interpretations"] = serde_json::json!([{"progressStatus": "UNSOLVED"}]);
    store.write_text("P-abc.json", &value.to_string()).unwrap();

    assert!(matches!(
        import_record(store.as_ref(), &rec.id),
        Err(ProtectionError::Codec(_))
    ));
}

#[test]
fn signing_a_suffixed_id_leaves_other_records_valid() {
    let dir = TempDir::new().unwrap();
    let abc = record("abc");
    fresh_coordinator(&dir).sign_record(&abc).unwrap();

    let pc = fresh_coordinator(&dir);
    pc.sign_record(&record("abc-Signature")).unwrap();
    pc.sign_record(&record("abc-Payload")).unwrap();

    let pc = fresh_coordinator(&dir);
    assert!(pc.verify_record(&abc).unwrap());
    assert!(pc.verify_stored_snapshot(&abc.id).unwrap());
    assert!(pc.verify_record(&record("abc-Signature")).unwrap());
}

// ============================================================================
// Digests
// ============================================================================

#[test]
fn disease_digest_stored_under_record_and_name() {
    let dir = TempDir::new().unwrap();
    let rec = record("abc");
    let disease = &rec.diseases[0];
    assert_eq!(disease.term.label, "Diabetes Mellitus");

    let digest = fresh_coordinator(&dir).hash_disease(&rec, disease).unwrap();

    let hasher = IntegrityHasher::new(open_store(&dir));
    assert_eq!(hasher.load_digest("abc", "Diabetes Mellitus").unwrap(), digest);
    assert!(hasher
        .check_digest(&encode(disease).unwrap(), &digest)
        .unwrap());
}

#[test]
fn digests_of_distinct_elements_differ() {
    let dir = TempDir::new().unwrap();
    let rec = record("abc");
    let pc = fresh_coordinator(&dir);
    let a = pc.hash_disease(&rec, &rec.diseases[0]).unwrap();
    let b = pc.hash_disease(&rec, &rec.diseases[1]).unwrap();
    assert_ne!(a, b);
}

// ============================================================================
// Keys
// ============================================================================

#[test]
fn keys_are_generated_once() {
    let dir = TempDir::new().unwrap();
    let first = KeyStore::new(open_store(&dir));
    first.ensure_keys().unwrap();
    let enc = first.encryption_key_pair().unwrap();

    let second = KeyStore::new(open_store(&dir));
    second.ensure_keys().unwrap();
    assert_eq!(
        second.encryption_key_pair().unwrap().public_key(),
        enc.public_key()
    );

    let mut names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "pk_hybrid_enc.json",
            "pk_verify.json",
            "sk_hybrid_enc.json",
            "sk_sign.json"
        ]
    );
}

#[test]
fn concurrent_first_use_agrees_on_one_key() {
    let dir = TempDir::new().unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = open_store(&dir);
            std::thread::spawn(move || {
                KeyStore::new(store)
                    .signing_key_pair()
                    .map(|pair| pair.public_jwk())
            })
        })
        .collect();

    let jwks: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert!(jwks.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn corrupt_key_file_is_key_unavailable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("sk_hybrid_enc.json"), "garbage").unwrap();
    let cipher = HybridCipher::new(Arc::new(KeyStore::new(open_store(&dir))));
    assert!(matches!(
        cipher.encrypt(b"P70Y", b"abc"),
        Err(ProtectionError::KeyUnavailable(_))
    ));
}
