//! FHIR bundle loader.
//!
//! Each entry is validated once into a [`ClinicalRecord`] and then written as
//! node/edge upserts. An entry that cannot be validated is skipped with a
//! reason; it never aborts the rest of the bundle.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::error::GraphError;
use super::models::{ConditionNode, Edge, MedicationNode, Node, NodeLabel, PatientNode};
use super::GraphStore;
use crate::fhir::{
    self, Bundle, CodeableConcept, Condition, MedicationRequest, Patient, Reference, Resource,
};

/// Name stored for patients without a usable `name` entry.
pub const UNKNOWN_PATIENT_NAME: &str = "Unknown";

/// Why a bundle entry produced no writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("patient resource has no id")]
    MissingPatientId,

    #[error("no subject reference")]
    MissingSubject,

    #[error("no coding entry with a code")]
    MissingCoding,

    #[error("malformed reference '{0}'")]
    MalformedReference(String),

    #[error("patient '{0}' is not in the graph")]
    UnknownPatient(String),
}

/// A skipped bundle entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position of the entry in the bundle.
    pub index: usize,
    pub resource_type: &'static str,
    pub resource_id: Option<String>,
    pub reason: SkipReason,
}

/// Outcome of loading one or more bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
    /// Entries that produced writes.
    pub entries_loaded: usize,
    /// Entries without a resource or with a resource type the loader does not ingest.
    pub entries_ignored: usize,
    pub nodes_written: usize,
    pub edges_written: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl LoadResult {
    /// Fold another result into this one.
    pub fn merge(&mut self, other: LoadResult) {
        self.entries_loaded += other.entries_loaded;
        self.entries_ignored += other.entries_ignored;
        self.nodes_written += other.nodes_written;
        self.edges_written += other.edges_written;
        self.skipped.extend(other.skipped);
    }
}

/// A validated bundle entry, ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClinicalRecord {
    Patient(PatientNode),
    Condition {
        patient_id: String,
        condition: ConditionNode,
        onset_date: Option<String>,
    },
    Medication {
        patient_id: String,
        medication: MedicationNode,
        /// Conditions named as the reason for the prescription.
        reasons: Vec<ConditionNode>,
    },
}

impl ClinicalRecord {
    fn patient_id(&self) -> &str {
        match self {
            ClinicalRecord::Patient(p) => &p.patient_id,
            ClinicalRecord::Condition { patient_id, .. }
            | ClinicalRecord::Medication { patient_id, .. } => patient_id,
        }
    }
}

/// Build the display name: first given name plus family name of the first name entry.
fn patient_name(patient: &Patient) -> String {
    let name = patient
        .name
        .first()
        .map(|n| {
            let given = n.given.first().map(String::as_str).unwrap_or("");
            let family = n.family.as_deref().unwrap_or("");
            format!("{} {}", given.trim(), family.trim()).trim().to_string()
        })
        .unwrap_or_default();

    if name.is_empty() {
        UNKNOWN_PATIENT_NAME.to_string()
    } else {
        name
    }
}

/// Resolve the patient id a subject reference points at.
fn subject_id(subject: Option<&Reference>) -> Result<String, SkipReason> {
    let reference = subject
        .and_then(|s| s.reference.as_deref())
        .ok_or(SkipReason::MissingSubject)?;
    fhir::reference_id(reference)
        .map(str::to_string)
        .ok_or_else(|| SkipReason::MalformedReference(reference.to_string()))
}

fn condition_node(concept: &CodeableConcept) -> Option<ConditionNode> {
    let coding = concept.primary_coding()?;
    let code = coding.code.as_deref()?.trim().to_string();
    Some(ConditionNode {
        display: coding
            .display
            .clone()
            .or_else(|| concept.text.clone())
            .unwrap_or_else(|| code.clone()),
        system: coding.system.clone(),
        code,
    })
}

fn medication_node(concept: &CodeableConcept) -> Option<MedicationNode> {
    condition_node(concept).map(|c| MedicationNode {
        code: c.code,
        display: c.display,
        system: c.system,
    })
}

fn validate_patient(patient: &Patient) -> Result<ClinicalRecord, SkipReason> {
    let id = patient
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(SkipReason::MissingPatientId)?;

    Ok(ClinicalRecord::Patient(PatientNode {
        patient_id: id.to_string(),
        name: patient_name(patient),
        birth_date: patient.birth_date.clone(),
        gender: patient.gender.clone(),
    }))
}

fn validate_condition(condition: &Condition) -> Result<ClinicalRecord, SkipReason> {
    let patient_id = subject_id(condition.subject.as_ref())?;
    let node = condition
        .code
        .as_ref()
        .and_then(condition_node)
        .ok_or(SkipReason::MissingCoding)?;

    Ok(ClinicalRecord::Condition {
        patient_id,
        condition: node,
        onset_date: condition.onset_date_time.clone(),
    })
}

fn validate_medication(
    request: &MedicationRequest,
    bundle_conditions: &HashMap<String, ConditionNode>,
) -> Result<ClinicalRecord, SkipReason> {
    let patient_id = subject_id(request.subject.as_ref())?;
    let node = request
        .medication_codeable_concept
        .as_ref()
        .and_then(medication_node)
        .ok_or(SkipReason::MissingCoding)?;

    let coded = request.reason_code.iter().filter_map(condition_node);
    // Unresolvable reason references are dropped, they do not skip the entry.
    let referenced = request
        .reason_reference
        .iter()
        .filter_map(|r| r.reference.as_deref())
        .filter_map(fhir::reference_id)
        .filter_map(|id| bundle_conditions.get(id).cloned());

    let mut reasons: Vec<ConditionNode> = Vec::new();
    for reason in coded.chain(referenced) {
        if !reasons.iter().any(|r| r.code == reason.code) {
            reasons.push(reason);
        }
    }

    Ok(ClinicalRecord::Medication {
        patient_id,
        medication: node,
        reasons,
    })
}

/// Condition resources of a bundle indexed by resource id, for resolving
/// `reasonReference` links.
fn index_conditions(bundle: &Bundle) -> HashMap<String, ConditionNode> {
    bundle
        .entry
        .iter()
        .filter_map(|entry| match &entry.resource {
            Some(Resource::Condition(c)) => {
                let id = c.id.clone()?;
                let node = c.code.as_ref().and_then(condition_node)?;
                Some((id, node))
            }
            _ => None,
        })
        .collect()
}

/// Loads FHIR bundles into a graph store.
pub struct GraphLoader {
    store: Arc<dyn GraphStore>,
}

impl GraphLoader {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Load every entry of a bundle.
    ///
    /// Loading the same bundle again leaves the graph unchanged. Store
    /// failures abort the load and are returned as-is.
    pub async fn load_bundle(&self, bundle: &Bundle) -> Result<LoadResult, GraphError> {
        let bundle_conditions = index_conditions(bundle);
        let mut result = LoadResult::default();

        for (index, entry) in bundle.entry.iter().enumerate() {
            let Some(resource) = &entry.resource else {
                result.entries_ignored += 1;
                continue;
            };

            let (validated, resource_id) = match resource {
                Resource::Patient(p) => (validate_patient(p), p.id.clone()),
                Resource::Condition(c) => (validate_condition(c), c.id.clone()),
                Resource::MedicationRequest(m) => {
                    (validate_medication(m, &bundle_conditions), m.id.clone())
                }
                Resource::Other => {
                    result.entries_ignored += 1;
                    continue;
                }
            };

            let outcome = match validated {
                Ok(record) => self.apply(&record, &mut result).await?,
                Err(reason) => Err(reason),
            };

            match outcome {
                Ok(()) => result.entries_loaded += 1,
                Err(reason) => {
                    warn!(
                        index,
                        resource_type = resource.type_name(),
                        resource_id = resource_id.as_deref().unwrap_or("-"),
                        %reason,
                        "Skipping bundle entry"
                    );
                    result.skipped.push(SkippedEntry {
                        index,
                        resource_type: resource.type_name(),
                        resource_id,
                        reason,
                    });
                }
            }
        }

        info!(
            loaded = result.entries_loaded,
            skipped = result.skipped.len(),
            ignored = result.entries_ignored,
            nodes = result.nodes_written,
            edges = result.edges_written,
            "Bundle load complete"
        );
        Ok(result)
    }

    /// Write one validated record.
    ///
    /// The outer result carries store failures, the inner one a skip.
    async fn apply(
        &self,
        record: &ClinicalRecord,
        result: &mut LoadResult,
    ) -> Result<Result<(), SkipReason>, GraphError> {
        if let ClinicalRecord::Patient(patient) = record {
            self.store.upsert_node(&Node::Patient(patient.clone())).await?;
            result.nodes_written += 1;
            return Ok(Ok(()));
        }

        let patient_id = record.patient_id();
        if !self.store.contains_node(NodeLabel::Patient, patient_id).await? {
            return Ok(Err(SkipReason::UnknownPatient(patient_id.to_string())));
        }

        match record {
            ClinicalRecord::Condition {
                patient_id,
                condition,
                onset_date,
            } => {
                self.store.upsert_node(&Node::Condition(condition.clone())).await?;
                let edge = Edge::has_condition(patient_id, &condition.code, onset_date.clone());
                self.store.upsert_edge(&edge).await?;
                result.nodes_written += 1;
                result.edges_written += 1;
            }
            ClinicalRecord::Medication {
                patient_id,
                medication,
                reasons,
            } => {
                self.store.upsert_node(&Node::Medication(medication.clone())).await?;
                self.store
                    .upsert_edge(&Edge::takes_medication(patient_id, &medication.code))
                    .await?;
                result.nodes_written += 1;
                result.edges_written += 1;

                for reason in reasons {
                    // A reason only names the condition; an existing node keeps its own record.
                    if !self.store.contains_node(NodeLabel::Condition, &reason.code).await? {
                        self.store.upsert_node(&Node::Condition(reason.clone())).await?;
                        result.nodes_written += 1;
                    }
                    self.store
                        .upsert_edge(&Edge::treats(&medication.code, &reason.code))
                        .await?;
                    result.edges_written += 1;
                    debug!(
                        medication = %medication.code,
                        condition = %reason.code,
                        "Treatment linked"
                    );
                }
            }
            ClinicalRecord::Patient(_) => {}
        }

        Ok(Ok(()))
    }
}
