//! Demonstration records: a COVID-19 case with diabetes and cardiomyopathy,
//! and a urothelial carcinoma case.
//!
//! All values are plaintext; protection is applied afterwards through the
//! coordinator.

use chrono::{DateTime, Utc};

use super::types::{
    Action, Disease, DoseInterval, Evidence, Individual, KaryotypicSex, MedicalAction, MetaData,
    OntologyClass, Phenopacket, PhenotypicFeature, Procedure, Quantity, RecordId, Resource,
    Status, TimeElement, TimeInterval, Treatment, Update, VitalStatus,
};

pub const SAMPLE_AGE: &str = "P70Y";
pub const ONCOLOGY_AGE: &str = "P58Y";
pub const SAMPLE_CREATOR: &str = "Peter R.";

// Every literal passed here is valid RFC 3339.
fn at(rfc3339: &str) -> DateTime<Utc> {
    rfc3339.parse().unwrap_or_default()
}

fn term(id: &str, label: &str) -> OntologyClass {
    OntologyClass::new(id, label)
}

fn feature(feature_type: OntologyClass) -> PhenotypicFeature {
    PhenotypicFeature {
        feature_type,
        severity: Some(term("HP:0012828", "Severe")),
        evidence: vec![Evidence {
            evidence_code: term(
                "ECO:0006017",
                "author statement from published clinical study used in manual assertion",
            ),
        }],
        onset: Some(TimeElement::Timestamp(at("2020-03-18T00:00:00Z"))),
        resolution: Some(TimeElement::Timestamp(at("2020-03-20T00:00:00Z"))),
    }
}

fn disease(disease_term: OntologyClass, excluded: bool) -> Disease {
    Disease {
        term: disease_term,
        excluded,
        disease_stage: vec![term("NCIT:C27971", "Stage IV")],
        clinical_tnm_finding: Vec::new(),
        primary_site: Some(term("UBERON:0003403", "skin of forearm")),
        onset: Some(TimeElement::age(SAMPLE_AGE)),
    }
}

fn medical_actions() -> Vec<MedicalAction> {
    let procedure = Procedure {
        code: term("NCIT:C80473", "Left Ventricular Assist Device"),
        body_site: Some(term("UBERON:0003403", "skin of forearm")),
        performed: Some(TimeElement::Timestamp(at("2016-01-01T00:00:00Z"))),
    };
    let treatment = Treatment {
        agent: term("NCIT:C722", "Oxygen"),
        route_of_administration: Some(term("NCIT:C38284", "Nasal Route of Administration")),
        dose_intervals: vec![DoseInterval {
            quantity: Quantity {
                unit: term("NCIT:C67388", "Liter per Minute"),
                value: 2.0,
            },
            schedule_frequency: Some(term("NCIT:C64496", "Twice Daily")),
            interval: TimeInterval {
                start: at("2020-03-20T00:00:00Z"),
                end: at("2020-03-22T00:00:00Z"),
            },
        }],
    };
    vec![
        MedicalAction::new(Action::Procedure(procedure)),
        MedicalAction::new(Action::Treatment(treatment)),
    ]
}

fn resource(id: &str, name: &str, prefix: &str, url: &str, version: &str) -> Resource {
    Resource {
        id: id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        version: version.to_string(),
        namespace_prefix: prefix.to_string(),
        iri_prefix: format!("http://purl.obolibrary.org/obo/{prefix}_"),
    }
}

fn metadata(resources: Vec<Resource>) -> MetaData {
    let created = at("2021-05-11T15:07:16.662Z");
    MetaData {
        created: Some(created),
        created_by: SAMPLE_CREATOR.to_string(),
        submitted_by: SAMPLE_CREATOR.to_string(),
        resources,
        updates: vec![Update {
            timestamp: created,
            updated_by: None,
            comment: None,
        }],
        phenopacket_schema_version: "2.0".to_string(),
    }
}

/// Build the demonstration record under `id`.
pub fn sample_record(id: RecordId) -> Phenopacket {
    Phenopacket {
        subject: Some(Individual {
            id: format!("{id}-subject"),
            time_at_last_encounter: Some(TimeElement::age(SAMPLE_AGE)),
            vital_status: Some(VitalStatus {
                status: Status::Deceased,
            }),
            karyotypic_sex: KaryotypicSex::Xy,
        }),
        phenotypic_features: vec![
            feature(term("NCIT:C27009", "Myalgia")),
            feature(term("NCIT:C2998", "Dyspnea")),
        ],
        diseases: vec![
            disease(term("NCIT:C2985", "Diabetes Mellitus"), true),
            disease(term("NCIT:C34830", "Cardiomyopathy"), false),
        ],
        medical_actions: medical_actions(),
        meta_data: Some(metadata(vec![resource(
            "ncit",
            "NCI Thesaurus OBO Edition",
            "NCIT",
            "http://purl.obolibrary.org/obo/ncit.owl",
            "http://purl.obolibrary.org/obo/ncit/releases/2019-11-26/ncit.owl",
        )])),
        id,
    }
}

/// Build the oncology demonstration record under `id`: an infiltrating
/// urothelial carcinoma with haematuria and dysuria. It has no medical
/// actions.
pub fn oncology_record(id: RecordId) -> Phenopacket {
    Phenopacket {
        subject: Some(Individual {
            id: format!("{id}-subject"),
            time_at_last_encounter: Some(TimeElement::age(ONCOLOGY_AGE)),
            vital_status: Some(VitalStatus {
                status: Status::Alive,
            }),
            karyotypic_sex: KaryotypicSex::Xy,
        }),
        phenotypic_features: vec![
            feature(term("HP:0000790", "Hematuria")),
            feature(term("HP:0100518", "Dysuria")),
        ],
        diseases: vec![Disease {
            term: term("NCIT:C39853", "Infiltrating Urothelial Carcinoma"),
            excluded: false,
            disease_stage: vec![term("NCIT:C27971", "Stage IV")],
            clinical_tnm_finding: vec![
                term("NCIT:C48766", "pT2b Stage Finding"),
                term("NCIT:C48750", "pN2 Stage Finding"),
            ],
            primary_site: Some(term("UBERON:0001255", "urinary bladder")),
            onset: Some(TimeElement::age(ONCOLOGY_AGE)),
        }],
        medical_actions: Vec::new(),
        meta_data: Some(metadata(vec![
            resource(
                "hp",
                "human phenotype ontology",
                "HP",
                "http://purl.obolibrary.org/obo/hp.owl",
                "2018-03-08",
            ),
            resource(
                "uberon",
                "uber anatomy ontology",
                "UBERON",
                "http://purl.obolibrary.org/obo/uberon.owl",
                "2019-03-08",
            ),
        ])),
        id,
    }
}
