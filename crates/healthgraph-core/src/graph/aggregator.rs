//! Per-patient summary aggregation.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

use super::error::GraphError;
use super::models::{
    AffectedSystem, BodySystemNode, BodySystemSummary, ConditionDetail, ConditionNode,
    ConditionRelationship, ConditionSummary, Hop, MedicationDetail, MedicationNode,
    MedicationSummary, PatientHealthSummary, PatientListing, TargetedSystem,
};
use super::GraphStore;

/// Collect items keyed by natural id: absent items are dropped and the first
/// occurrence of each key wins. Order of first occurrence is kept.
pub fn distinct_present<T, K, I, F>(items: I, key: F) -> Vec<T>
where
    I: IntoIterator<Item = Option<T>>,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Displays of the conditions `medication` treats, one per condition code.
fn treated_displays(medication: &str, treats: &[Hop<ConditionNode>]) -> Vec<String> {
    distinct_present(
        treats
            .iter()
            .filter(|hop| hop.from == medication)
            .map(|hop| hop.target.as_ref()),
        |c| c.code.clone(),
    )
    .into_iter()
    .map(|c| c.display.clone())
    .collect()
}

/// Fold HAS_CONDITION hops and the AFFECTS hops leaving them into per-condition
/// details, sorted by code.
pub(crate) fn condition_details(
    conditions: &[Hop<ConditionNode>],
    affects: &[Hop<BodySystemNode>],
) -> Vec<ConditionDetail> {
    let mut details = distinct_present(
        conditions.iter().map(|hop| {
            hop.target.as_ref().map(|c| ConditionDetail {
                code: c.code.clone(),
                display: c.display.clone(),
                coding_system: c.system.clone(),
                onset: hop.props.onset_date.clone(),
                body_systems: distinct_present(
                    affects.iter().filter(|a| a.from == c.code).map(|a| {
                        a.target.as_ref().map(|b| AffectedSystem {
                            system: b.name.clone(),
                            subsystem: a.props.subsystem.clone(),
                        })
                    }),
                    |b| b.system.clone(),
                ),
            })
        }),
        |c| c.code.clone(),
    );
    details.sort_by(|a, b| a.code.cmp(&b.code));
    details
}

/// Fold TAKES_MEDICATION hops with the TREATS and TARGETS hops leaving them
/// into per-medication details, sorted by code.
pub(crate) fn medication_details(
    medications: &[Hop<MedicationNode>],
    treats: &[Hop<ConditionNode>],
    targets: &[Hop<BodySystemNode>],
) -> Vec<MedicationDetail> {
    let mut details = distinct_present(
        medications.iter().map(|hop| {
            hop.target.as_ref().map(|m| MedicationDetail {
                code: m.code.clone(),
                display: m.display.clone(),
                coding_system: m.system.clone(),
                treats: treated_displays(&m.code, treats),
                targets: distinct_present(
                    targets.iter().filter(|t| t.from == m.code).map(|t| {
                        t.target.as_ref().map(|b| TargetedSystem {
                            system: b.name.clone(),
                            action: t.props.action.clone(),
                        })
                    }),
                    |t| t.system.clone(),
                ),
            })
        }),
        |m| m.code.clone(),
    );
    details.sort_by(|a, b| a.code.cmp(&b.code));
    details
}

/// Read-only queries over the graph.
pub struct SummaryAggregator {
    store: Arc<dyn GraphStore>,
}

impl SummaryAggregator {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Fold a patient's neighborhood into one summary.
    ///
    /// Returns [`GraphError::PatientNotFound`] for an unknown id. A known
    /// patient without edges gets a summary with empty lists.
    pub async fn get_summary(&self, patient_id: &str) -> Result<PatientHealthSummary, GraphError> {
        let hood = self
            .store
            .neighborhood(patient_id)
            .await?
            .ok_or_else(|| GraphError::PatientNotFound(patient_id.to_string()))?;

        let conditions = distinct_present(
            hood.conditions.iter().map(|hop| {
                hop.target.as_ref().map(|c| ConditionSummary {
                    code: c.code.clone(),
                    display: c.display.clone(),
                    onset: hop.props.onset_date.clone(),
                })
            }),
            |c| c.code.clone(),
        );
        let patient_codes: HashSet<&str> = conditions.iter().map(|c| c.code.as_str()).collect();

        let body_systems_affected = distinct_present(
            hood.affects
                .iter()
                .filter(|hop| patient_codes.contains(hop.from.as_str()))
                .map(|hop| {
                    hop.target.as_ref().map(|b| BodySystemSummary {
                        system: b.name.clone(),
                        description: b.description.clone(),
                    })
                }),
            |b| b.system.clone(),
        );

        let medications = distinct_present(
            hood.medications.iter().map(|hop| {
                hop.target.as_ref().map(|m| MedicationSummary {
                    code: m.code.clone(),
                    display: m.display.clone(),
                    treats: treated_displays(&m.code, &hood.treats),
                })
            }),
            |m| m.code.clone(),
        );

        let displays: HashMap<&str, &str> = conditions
            .iter()
            .map(|c| (c.code.as_str(), c.display.as_str()))
            .collect();
        let condition_relationships = distinct_present(
            hood.related.iter().map(|hop| {
                let condition = displays.get(hop.from.as_str())?;
                let related_to = displays.get(hop.to.as_str())?;
                Some(ConditionRelationship {
                    condition: condition.to_string(),
                    related_to: related_to.to_string(),
                })
            }),
            |r| (r.condition.clone(), r.related_to.clone()),
        );

        debug!(
            patient = %patient_id,
            conditions = conditions.len(),
            medications = medications.len(),
            "Summary built"
        );

        Ok(PatientHealthSummary {
            patient_id: hood.patient.patient_id,
            patient_name: hood.patient.name,
            conditions,
            medications,
            body_systems_affected,
            condition_relationships,
        })
    }

    /// Patients ordered by name.
    pub async fn list_patients(&self, limit: usize) -> Result<Vec<PatientListing>, GraphError> {
        self.store.patients(None, limit).await
    }

    /// Patients whose name contains `term`, case-insensitively.
    pub async fn search_patients(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<PatientListing>, GraphError> {
        let term = term.trim();
        if term.is_empty() {
            return self.list_patients(limit).await;
        }
        self.store.patients(Some(term), limit).await
    }

    /// A patient's conditions with coding system, onset and affected body systems.
    pub async fn patient_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<ConditionDetail>, GraphError> {
        self.store
            .patient_conditions(patient_id)
            .await?
            .ok_or_else(|| GraphError::PatientNotFound(patient_id.to_string()))
    }

    /// A patient's medications with treated conditions and targeted body systems.
    pub async fn patient_medications(
        &self,
        patient_id: &str,
    ) -> Result<Vec<MedicationDetail>, GraphError> {
        self.store
            .patient_medications(patient_id)
            .await?
            .ok_or_else(|| GraphError::PatientNotFound(patient_id.to_string()))
    }

    /// Every body system in the graph, ordered by name.
    pub async fn body_systems(&self) -> Result<Vec<BodySystemSummary>, GraphError> {
        Ok(self
            .store
            .body_systems()
            .await?
            .into_iter()
            .map(|b| BodySystemSummary {
                system: b.name,
                description: b.description,
            })
            .collect())
    }
}
