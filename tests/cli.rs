//! Exit codes and output of the `phenoguard` binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn phenoguard(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_phenoguard"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("PHENOGUARD_CONFIG")
        .env("RUST_LOG", "off")
        .output()
        .expect("run phenoguard")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn keys_prints_public_jwks_only() {
    let dir = TempDir::new().unwrap();
    let out = phenoguard(dir.path(), &["keys"]);
    assert!(out.status.success());

    let jwks: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(jwks["encryption"]["crv"], "P-256");
    assert!(jwks["signing"].get("d").is_none());
}

#[test]
fn create_sign_verify_flow() {
    let dir = TempDir::new().unwrap();
    let out = phenoguard(dir.path(), &["create", "--id", "abc"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "abc");
    assert!(dir.path().join("P-abc.json").is_file());

    assert!(phenoguard(dir.path(), &["sign", "abc"]).status.success());
    let verify = phenoguard(dir.path(), &["verify", "abc"]);
    assert_eq!(verify.status.code(), Some(0));
    assert_eq!(stdout(&verify), "valid");

    // Encrypting changes the record, so the old signature no longer holds.
    assert!(phenoguard(dir.path(), &["encrypt", "abc"]).status.success());
    assert_eq!(phenoguard(dir.path(), &["verify", "abc"]).status.code(), Some(2));
}

#[test]
fn encrypt_then_decrypt_fields() {
    let dir = TempDir::new().unwrap();
    phenoguard(dir.path(), &["create", "--id", "abc"]);
    assert!(phenoguard(dir.path(), &["encrypt", "abc"]).status.success());

    let record = std::fs::read_to_string(dir.path().join("P-abc.json")).unwrap();
    assert!(!record.contains("P70Y"));

    let out = phenoguard(dir.path(), &["decrypt", "abc"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("createdBy: Peter R."));
    assert!(text.contains("timeAtLastEncounter: P70Y"));
}

#[test]
fn metadata_sealing() {
    let dir = TempDir::new().unwrap();
    phenoguard(dir.path(), &["create", "--id", "abc"]);
    assert!(phenoguard(dir.path(), &["encrypt", "abc", "--metadata"])
        .status
        .success());
    assert!(dir.path().join("abc.sealed").is_file());

    let out = phenoguard(dir.path(), &["decrypt", "abc", "--metadata"]);
    assert!(out.status.success());
    let meta: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(meta["createdBy"], "Peter R.");
}

#[test]
fn hash_and_check_elements() {
    let dir = TempDir::new().unwrap();
    phenoguard(dir.path(), &["create", "--id", "abc"]);

    let out = phenoguard(dir.path(), &["hash", "abc", "--element", "disease", "--index", "0"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).len(), 64);

    let check = phenoguard(dir.path(), &["check", "abc", "--element", "disease", "--index", "0"]);
    assert_eq!(check.status.code(), Some(0));

    let digests = std::fs::read_to_string(dir.path().join("abc.txt")).unwrap();
    assert!(digests.starts_with("Diabetes Mellitus:"));
}

#[test]
fn check_reports_a_changed_element() {
    let dir = TempDir::new().unwrap();
    phenoguard(dir.path(), &["create", "--id", "abc"]);
    let hash = phenoguard(dir.path(), &["hash", "abc", "--element", "disease", "--index", "0"]);
    assert!(hash.status.success());

    let path = dir.path().join("P-abc.json");
    let mut record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let excluded = record["diseases"][0]["excluded"].as_bool().unwrap_or(false);
    record["diseases"][0]["excluded"] = (!excluded).into();
    std::fs::write(&path, record.to_string()).unwrap();

    let check = phenoguard(dir.path(), &["check", "abc", "--element", "disease", "--index", "0"]);
    assert_eq!(check.status.code(), Some(2));
    assert!(stdout(&check).is_empty());
}

#[test]
fn oncology_case_round_trip() {
    let dir = TempDir::new().unwrap();
    let out = phenoguard(dir.path(), &["create", "--id", "onc", "--case", "oncology"]);
    assert!(out.status.success());

    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("P-onc.json")).unwrap())
            .unwrap();
    assert_eq!(record["subject"]["timeAtLastEncounter"]["age"]["iso8601duration"], "P58Y");

    assert!(phenoguard(dir.path(), &["encrypt", "onc"]).status.success());
    let out = phenoguard(dir.path(), &["decrypt", "onc"]);
    assert!(stdout(&out).contains("timeAtLastEncounter: P58Y"));
}

#[test]
fn check_without_digest_fails() {
    let dir = TempDir::new().unwrap();
    phenoguard(dir.path(), &["create", "--id", "abc"]);
    let out = phenoguard(dir.path(), &["check", "abc", "--element", "feature"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn missing_record_is_an_error() {
    let dir = TempDir::new().unwrap();
    let out = phenoguard(dir.path(), &["sign", "nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("signatures.json").exists());
}

#[test]
fn out_of_range_index_is_an_error() {
    let dir = TempDir::new().unwrap();
    phenoguard(dir.path(), &["create", "--id", "abc"]);
    let out = phenoguard(dir.path(), &["hash", "abc", "--element", "action", "--index", "9"]);
    assert_eq!(out.status.code(), Some(1));
}
