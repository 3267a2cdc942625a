//! phenoguard: protect, sign and check clinical phenotype records on disk.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use phenoguard::record::{
    export_record, import_record, oncology_record, sample_record, Phenopacket,
};
use phenoguard::{
    CipherMode, Config, Digest, FileStore, ProtectionCoordinator, ProtectionError, RecordId,
    Revealed, SignatureMode, SignatureOutcome,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phenoguard")]
#[command(about = "Selective field protection for clinical phenotype records")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "PHENOGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(short, long, env = "PHENOGUARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Provision both key pairs and print their public halves
    Keys,
    /// Write a demonstration record as P-<id>.json
    Create {
        /// Record id (a random UUID if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Which demonstration case to write
        #[arg(long, value_enum, default_value_t = SampleCase::Covid19)]
        case: SampleCase,
    },
    /// Sign a record and store the signature
    Sign { id: String },
    /// Verify a record against its stored signature
    Verify { id: String },
    /// Protect the subject age and metadata creator in place
    Encrypt {
        id: String,
        /// Seal the whole metadata block instead
        #[arg(long)]
        metadata: bool,
    },
    /// Print the protected values of a record
    Decrypt {
        id: String,
        /// Unseal the whole metadata block instead
        #[arg(long)]
        metadata: bool,
    },
    /// Compute and store the digest of one record element
    Hash(ElementArgs),
    /// Check one record element against its stored digest
    Check(ElementArgs),
}

#[derive(Args)]
struct ElementArgs {
    id: String,

    #[arg(long, value_enum)]
    element: ElementKind,

    /// Position of the element in its list
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Digest name for medical actions (defaults to the action's label)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SampleCase {
    Covid19,
    Oncology,
}

#[derive(Clone, Copy, ValueEnum)]
enum ElementKind {
    Disease,
    Feature,
    Action,
}

fn cipher_mode(metadata: bool) -> CipherMode {
    if metadata {
        CipherMode::MetadataBlock
    } else {
        CipherMode::Fields
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let mismatch = matches!(
                e.downcast_ref::<ProtectionError>(),
                Some(ProtectionError::VerificationFailed(_))
            );
            eprintln!("Error: {e:#}");
            ExitCode::from(if mismatch { 2 } else { 1 })
        }
    }
}

fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(
        FileStore::open(&config.data_dir)
            .with_context(|| format!("opening data dir {}", config.data_dir.display()))?,
    );
    let coordinator = ProtectionCoordinator::from_config(store.clone(), config);
    debug!(data_dir = %config.data_dir.display(), "Ready");

    match command {
        Command::Keys => {
            let keys = coordinator.key_store();
            keys.ensure_keys()?;
            let jwks = serde_json::json!({
                "encryption": keys.encryption_key_pair()?.public_jwk(),
                "signing": keys.signing_key_pair()?.public_jwk(),
            });
            println!("{}", serde_json::to_string_pretty(&jwks)?);
        }
        Command::Create { id, case } => {
            let id = match id {
                Some(id) => RecordId::new(id)?,
                None => RecordId::generate(),
            };
            let record = match case {
                SampleCase::Covid19 => sample_record(id.clone()),
                SampleCase::Oncology => oncology_record(id.clone()),
            };
            export_record(store.as_ref(), &record)?;
            println!("{id}");
        }
        Command::Sign { id } => {
            let record = load(store.as_ref(), &id)?;
            signature_pass(&coordinator, &record, SignatureMode::Sign)?;
        }
        Command::Verify { id } => {
            let record = load(store.as_ref(), &id)?;
            signature_pass(&coordinator, &record, SignatureMode::Verify)?;
        }
        Command::Encrypt { id, metadata } => {
            let record = load(store.as_ref(), &id)?;
            let protected = coordinator.encrypt_record(&record, cipher_mode(metadata))?;
            export_record(store.as_ref(), &protected)?;
        }
        Command::Decrypt { id, metadata } => {
            let record = load(store.as_ref(), &id)?;
            match coordinator.decrypt_record(&record, cipher_mode(metadata))? {
                Revealed::Fields(fields) => {
                    if let Some(creator) = fields.creator {
                        println!("createdBy: {creator}");
                    }
                    if let Some(age) = fields.age {
                        println!("timeAtLastEncounter: {age}");
                    }
                }
                Revealed::Metadata(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
            }
        }
        Command::Hash(args) => {
            let record = load(store.as_ref(), &args.id)?;
            let digest = hash_element(&coordinator, &record, &args)?;
            println!("{digest}");
        }
        Command::Check(args) => {
            let record = load(store.as_ref(), &args.id)?;
            if check_element(&coordinator, &record, &args)? {
                println!("valid");
            } else {
                return Err(ProtectionError::VerificationFailed(format!(
                    "digest of element {} in {}",
                    args.index, args.id
                ))
                .into());
            }
        }
    }
    Ok(())
}

fn load(store: &FileStore, id: &str) -> anyhow::Result<Phenopacket> {
    let id = RecordId::new(id)?;
    import_record(store, &id).with_context(|| format!("loading record {id}"))
}

fn signature_pass(
    coordinator: &ProtectionCoordinator,
    record: &Phenopacket,
    mode: SignatureMode,
) -> anyhow::Result<()> {
    match coordinator.apply_signature(record, mode)? {
        SignatureOutcome::Signed(signature) => println!("{}", signature.to_base64()),
        SignatureOutcome::Verified(true) => println!("valid"),
        SignatureOutcome::Verified(false) => {
            return Err(
                ProtectionError::VerificationFailed(format!("signature of {}", record.id)).into(),
            )
        }
    }
    Ok(())
}

fn out_of_range(kind: &str, index: usize, len: usize) -> ProtectionError {
    ProtectionError::InvalidInput(format!(
        "{kind} index {index} out of range (record has {len})"
    ))
}

fn hash_element(
    coordinator: &ProtectionCoordinator,
    record: &Phenopacket,
    args: &ElementArgs,
) -> anyhow::Result<Digest> {
    let i = args.index;
    let digest = match args.element {
        ElementKind::Disease => {
            let disease = record
                .diseases
                .get(i)
                .ok_or_else(|| out_of_range("disease", i, record.diseases.len()))?;
            coordinator.hash_disease(record, disease)?
        }
        ElementKind::Feature => {
            let feature = record
                .phenotypic_features
                .get(i)
                .ok_or_else(|| out_of_range("feature", i, record.phenotypic_features.len()))?;
            coordinator.hash_phenotypic_feature(record, feature)?
        }
        ElementKind::Action => {
            let action = record
                .medical_actions
                .get(i)
                .ok_or_else(|| out_of_range("action", i, record.medical_actions.len()))?;
            let name = args
                .name
                .as_deref()
                .unwrap_or_else(|| action.default_element_name());
            coordinator.hash_medical_action(record, name, action)?
        }
    };
    Ok(digest)
}

fn check_element(
    coordinator: &ProtectionCoordinator,
    record: &Phenopacket,
    args: &ElementArgs,
) -> anyhow::Result<bool> {
    let i = args.index;
    let valid = match args.element {
        ElementKind::Disease => {
            let disease = record
                .diseases
                .get(i)
                .ok_or_else(|| out_of_range("disease", i, record.diseases.len()))?;
            coordinator.verify_disease(record, disease)?
        }
        ElementKind::Feature => {
            let feature = record
                .phenotypic_features
                .get(i)
                .ok_or_else(|| out_of_range("feature", i, record.phenotypic_features.len()))?;
            coordinator.verify_phenotypic_feature(record, feature)?
        }
        ElementKind::Action => {
            let action = record
                .medical_actions
                .get(i)
                .ok_or_else(|| out_of_range("action", i, record.medical_actions.len()))?;
            let name = args
                .name
                .as_deref()
                .unwrap_or_else(|| action.default_element_name());
            coordinator.verify_medical_action(record, name, action)?
        }
    };
    Ok(valid)
}
