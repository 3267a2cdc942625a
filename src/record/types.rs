//! Phenopacket record model.
//!
//! Field names follow the phenopacket JSON schema (`camelCase`). Unknown
//! fields are rejected: anything a record carries must be part of its
//! canonical bytes. Beyond that, only the type tags that decide which time
//! representation a field uses are validated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtectionError, Result};
use crate::store::validate_name;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a record. Used verbatim as the encryption context and as
/// the key (and file name) under which signatures and digests are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_name(&id).map_err(|_| {
            ProtectionError::invalid(format!(
                "record id {id:?} must be non-empty and free of path separators"
            ))
        })?;
        Ok(Self(id))
    }

    /// A fresh random (UUID v4) identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = ProtectionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = ProtectionError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

// ============================================================================
// Building blocks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OntologyClass {
    pub id: String,
    pub label: String,
}

impl OntologyClass {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// When something happened. Exactly one representation is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum TimeElement {
    /// ISO-8601 duration such as `P70Y`, or its Base64 ciphertext once
    /// protected.
    Age { iso8601duration: String },
    Timestamp(DateTime<Utc>),
    Interval(TimeInterval),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Age,
    Timestamp,
    Interval,
}

impl fmt::Display for TimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Age => "age",
            Self::Timestamp => "timestamp",
            Self::Interval => "interval",
        };
        f.write_str(name)
    }
}

impl TimeElement {
    pub fn age(iso8601duration: impl Into<String>) -> Self {
        Self::Age {
            iso8601duration: iso8601duration.into(),
        }
    }

    pub fn kind(&self) -> TimeKind {
        match self {
            Self::Age { .. } => TimeKind::Age,
            Self::Timestamp(_) => TimeKind::Timestamp,
            Self::Interval(_) => TimeKind::Interval,
        }
    }
}

fn expect_kind(field: &str, value: Option<&TimeElement>, expected: TimeKind) -> Result<()> {
    match value {
        Some(element) if element.kind() != expected => Err(ProtectionError::invalid(format!(
            "{field} must use the {expected} representation, got {}",
            element.kind()
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Evidence {
    pub evidence_code: OntologyClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Quantity {
    pub unit: OntologyClass,
    pub value: f64,
}

// ============================================================================
// Individual
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    UnknownStatus,
    Alive,
    Deceased,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VitalStatus {
    pub status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KaryotypicSex {
    #[default]
    UnknownKaryotype,
    Xx,
    Xy,
    Xo,
    Xxy,
    OtherKaryotype,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Individual {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_at_last_encounter: Option<TimeElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vital_status: Option<VitalStatus>,
    #[serde(default)]
    pub karyotypic_sex: KaryotypicSex,
}

impl Individual {
    pub fn validate(&self) -> Result<()> {
        expect_kind(
            "timeAtLastEncounter",
            self.time_at_last_encounter.as_ref(),
            TimeKind::Age,
        )
    }
}

// ============================================================================
// Phenotypic features and diseases
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhenotypicFeature {
    #[serde(rename = "type")]
    pub feature_type: OntologyClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<TimeElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<TimeElement>,
}

impl PhenotypicFeature {
    pub fn validate(&self) -> Result<()> {
        expect_kind("phenotypic feature onset", self.onset.as_ref(), TimeKind::Timestamp)?;
        expect_kind(
            "phenotypic feature resolution",
            self.resolution.as_ref(),
            TimeKind::Timestamp,
        )
    }

    /// Name under which this feature's digest is stored.
    pub fn element_name(&self) -> &str {
        &self.feature_type.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Disease {
    pub term: OntologyClass,
    #[serde(default)]
    pub excluded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disease_stage: Vec<OntologyClass>,
    /// TNM staging findings of oncological diseases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clinical_tnm_finding: Vec<OntologyClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_site: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<TimeElement>,
}

impl Disease {
    pub fn validate(&self) -> Result<()> {
        expect_kind("disease onset", self.onset.as_ref(), TimeKind::Age)
    }

    /// Name under which this disease's digest is stored.
    pub fn element_name(&self) -> &str {
        &self.term.label
    }
}

// ============================================================================
// Medical actions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Procedure {
    pub code: OntologyClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_site: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed: Option<TimeElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DoseInterval {
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_frequency: Option<OntologyClass>,
    pub interval: TimeInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Treatment {
    pub agent: OntologyClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_of_administration: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dose_intervals: Vec<DoseInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RadiationTherapy {
    pub modality: OntologyClass,
    pub body_site: OntologyClass,
    pub dosage: i32,
    pub fractions: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimenStatus {
    #[default]
    UnknownStatus,
    Started,
    Completed,
    Discontinued,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TherapeuticRegimen {
    pub ontology_class: OntologyClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeElement>,
    #[serde(default)]
    pub regimen_status: RegimenStatus,
}

/// The one action a `MedicalAction` describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Procedure(Procedure),
    Treatment(Treatment),
    RadiationTherapy(RadiationTherapy),
    TherapeuticRegimen(TherapeuticRegimen),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MedicalActionRepr")]
pub struct MedicalAction {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_target: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_intent: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_to_treatment: Option<OntologyClass>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adverse_events: Vec<OntologyClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_termination_reason: Option<OntologyClass>,
}

impl MedicalAction {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            treatment_target: None,
            treatment_intent: None,
            response_to_treatment: None,
            adverse_events: Vec::new(),
            treatment_termination_reason: None,
        }
    }

    /// Label of the action's main term, used as the default element name
    /// when the caller does not supply one.
    pub fn default_element_name(&self) -> &str {
        match &self.action {
            Action::Procedure(p) => &p.code.label,
            Action::Treatment(t) => &t.agent.label,
            Action::RadiationTherapy(r) => &r.modality.label,
            Action::TherapeuticRegimen(r) => &r.ontology_class.label,
        }
    }
}

/// Wire shape of a [`MedicalAction`]. The action is one of four optional
/// keys and exactly one must be present.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MedicalActionRepr {
    procedure: Option<Procedure>,
    treatment: Option<Treatment>,
    radiation_therapy: Option<RadiationTherapy>,
    therapeutic_regimen: Option<TherapeuticRegimen>,
    treatment_target: Option<OntologyClass>,
    treatment_intent: Option<OntologyClass>,
    response_to_treatment: Option<OntologyClass>,
    #[serde(default)]
    adverse_events: Vec<OntologyClass>,
    treatment_termination_reason: Option<OntologyClass>,
}

impl TryFrom<MedicalActionRepr> for MedicalAction {
    type Error = String;

    fn try_from(repr: MedicalActionRepr) -> std::result::Result<Self, String> {
        let mut actions = [
            repr.procedure.map(Action::Procedure),
            repr.treatment.map(Action::Treatment),
            repr.radiation_therapy.map(Action::RadiationTherapy),
            repr.therapeutic_regimen.map(Action::TherapeuticRegimen),
        ]
        .into_iter()
        .flatten();
        let action = match (actions.next(), actions.next()) {
            (Some(action), None) => action,
            (None, _) => return Err("medical action names no action".to_string()),
            (Some(_), Some(_)) => {
                return Err("medical action names more than one action".to_string());
            }
        };
        Ok(Self {
            action,
            treatment_target: repr.treatment_target,
            treatment_intent: repr.treatment_intent,
            response_to_treatment: repr.response_to_treatment,
            adverse_events: repr.adverse_events,
            treatment_termination_reason: repr.treatment_termination_reason,
        })
    }
}

// ============================================================================
// Metadata and the record itself
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub version: String,
    pub namespace_prefix: String,
    pub iri_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Update {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Plaintext creator, or its Base64 ciphertext once protected.
    pub created_by: String,
    #[serde(default)]
    pub submitted_by: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<Update>,
    pub phenopacket_schema_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Phenopacket {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Individual>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phenotypic_features: Vec<PhenotypicFeature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diseases: Vec<Disease>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_actions: Vec<MedicalAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

impl Phenopacket {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            subject: None,
            phenotypic_features: Vec::new(),
            diseases: Vec::new(),
            medical_actions: Vec::new(),
            meta_data: None,
        }
    }

    /// Check the time representation of every field that has a fixed one.
    pub fn validate(&self) -> Result<()> {
        if let Some(subject) = &self.subject {
            subject.validate()?;
        }
        for feature in &self.phenotypic_features {
            feature.validate()?;
        }
        for disease in &self.diseases {
            disease.validate()?;
        }
        Ok(())
    }
}
