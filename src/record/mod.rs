//! Clinical phenotype records (phenopackets).

pub mod codec;
pub mod sample;
pub mod types;

pub use codec::{decode_metadata, encode, export_record, import_record, record_file_name};
pub use sample::{oncology_record, sample_record};
pub use types::*;
