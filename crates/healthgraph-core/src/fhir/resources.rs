//! FHIR R4 resource subset.
//!
//! Only the fields the loader reads are modeled; everything else in the
//! JSON is ignored. All fields are optional because real-world bundles omit
//! them freely.

use serde::{Deserialize, Serialize};

/// A FHIR `Bundle`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Create a bundle from resources.
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        Self {
            id: None,
            entry: resources
                .into_iter()
                .map(|resource| BundleEntry {
                    full_url: None,
                    resource: Some(resource),
                })
                .collect(),
        }
    }

    /// Parse a bundle from FHIR JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(default)]
    pub resource: Option<Resource>,
}

/// A resource inside a bundle entry, tagged by `resourceType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(Patient),
    Condition(Condition),
    MedicationRequest(MedicationRequest),
    /// Any resource type the loader does not ingest.
    #[serde(other)]
    Other,
}

impl Resource {
    /// The FHIR `resourceType` name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Condition(_) => "Condition",
            Resource::MedicationRequest(_) => "MedicationRequest",
            Resource::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Vec<HumanName>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub given: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subject: Option<Reference>,
    #[serde(default)]
    pub code: Option<CodeableConcept>,
    #[serde(default)]
    pub onset_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subject: Option<Reference>,
    #[serde(default)]
    pub medication_codeable_concept: Option<CodeableConcept>,
    #[serde(default)]
    pub reason_code: Vec<CodeableConcept>,
    #[serde(default)]
    pub reason_reference: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    #[serde(default)]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// The first coding that carries a non-empty code.
    pub fn primary_coding(&self) -> Option<&Coding> {
        self.coding
            .iter()
            .find(|c| c.code.as_deref().is_some_and(|code| !code.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

impl Reference {
    /// Build a reference from a literal string such as `Patient/p1`.
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            display: None,
        }
    }
}
