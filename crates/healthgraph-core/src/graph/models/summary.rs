//! Query results: patient health summaries, listings, and graph statistics.

use serde::{Deserialize, Serialize};

/// Consolidated view of one patient's graph neighborhood.
///
/// This is the record handed to the explanation generator, serialized in
/// camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientHealthSummary {
    pub patient_id: String,
    pub patient_name: String,
    pub conditions: Vec<ConditionSummary>,
    pub medications: Vec<MedicationSummary>,
    pub body_systems_affected: Vec<BodySystemSummary>,
    pub condition_relationships: Vec<ConditionRelationship>,
}

impl PatientHealthSummary {
    /// True when the patient has no conditions and no medications.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.medications.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub code: String,
    pub display: String,
    #[serde(default)]
    pub onset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationSummary {
    pub code: String,
    pub display: String,
    /// Display names of the conditions this medication treats.
    #[serde(default)]
    pub treats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySystemSummary {
    pub system: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRelationship {
    pub condition: String,
    pub related_to: String,
}

/// One of a patient's conditions with the body systems it affects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDetail {
    pub code: String,
    pub display: String,
    #[serde(default)]
    pub coding_system: Option<String>,
    #[serde(default)]
    pub onset: Option<String>,
    pub body_systems: Vec<AffectedSystem>,
}

/// A body system reached over an AFFECTS edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedSystem {
    pub system: String,
    #[serde(default)]
    pub subsystem: Option<String>,
}

/// One of a patient's medications with what it treats and targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDetail {
    pub code: String,
    pub display: String,
    #[serde(default)]
    pub coding_system: Option<String>,
    /// Display names of the conditions this medication treats.
    pub treats: Vec<String>,
    pub targets: Vec<TargetedSystem>,
}

/// A body system reached over a TARGETS edge, with how the drug acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetedSystem {
    pub system: String,
    #[serde(default)]
    pub action: Option<String>,
}

/// A row in the patient directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientListing {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    pub condition_count: usize,
}

/// Node counts per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    pub patients: usize,
    pub conditions: usize,
    pub medications: usize,
    pub body_systems: usize,
}

/// Edge counts per relationship type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCounts {
    pub has_condition: usize,
    pub takes_medication: usize,
    pub affects: usize,
    pub treats: usize,
    pub targets: usize,
    pub related_to: usize,
}

impl EdgeCounts {
    pub fn total(&self) -> usize {
        self.has_condition
            + self.takes_medication
            + self.affects
            + self.treats
            + self.targets
            + self.related_to
    }
}

/// Statistics about the graph contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: NodeCounts,
    pub edges: EdgeCounts,
    /// When the counts were taken.
    pub captured_at: chrono::DateTime<chrono::Utc>,
}
