//! Selective field protection for clinical phenotype records.
//!
//! This crate provides:
//! - A key store that provisions and persists P-256 key material
//! - Context-bound hybrid encryption of individual field values
//! - Whole-record signatures with a persistent signature store
//! - Per-element Keccak-256 digests with a persistent digest store
//! - A coordinator that maps record fields onto those services
//!
//! The cryptographic primitives live in `phenoguard-crypto`; this crate
//! adds persistence, the record model and the CLI.

pub mod cipher;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod integrity;
pub mod keystore;
pub mod record;
pub mod signature;
pub mod store;

pub use cipher::{CipherMode, HybridCipher};
pub use config::Config;
pub use coordinator::{ProtectionCoordinator, Revealed, RevealedFields, SignatureOutcome};
pub use error::{ProtectionError, Result};
pub use integrity::IntegrityHasher;
pub use keystore::{EncryptionKeyPair, KeyStore, SigningKeyPair};
pub use phenoguard_crypto::Digest;
pub use record::{Phenopacket, RecordId};
pub use signature::{Signature, SignatureMode, SignatureService};
pub use store::{FileStore, MemoryStore, TextStore};
