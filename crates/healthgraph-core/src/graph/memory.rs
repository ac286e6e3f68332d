//! In-memory graph store.
//!
//! Implements the same upsert/read contract as the SurrealDB store. Used by
//! tests and dry runs. All state sits behind one lock, so a neighborhood read
//! is a consistent snapshot.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::aggregator::{condition_details, medication_details};
use super::error::GraphError;
use super::models::{
    BodySystemNode, ConditionDetail, ConditionNode, Edge, EdgeCounts, EdgeKind, EdgeProps,
    GraphStats, Hop, MedicationDetail, MedicationNode, Neighborhood, Node, NodeCounts, NodeLabel,
    PatientListing, PatientNode,
};
use super::GraphStore;

type EdgeKey = (EdgeKind, String, String);

#[derive(Debug, Default)]
struct GraphState {
    patients: BTreeMap<String, PatientNode>,
    conditions: BTreeMap<String, ConditionNode>,
    medications: BTreeMap<String, MedicationNode>,
    body_systems: BTreeMap<String, BodySystemNode>,
    edges: BTreeMap<EdgeKey, EdgeProps>,
}

impl GraphState {
    fn contains(&self, label: NodeLabel, key: &str) -> bool {
        match label {
            NodeLabel::Patient => self.patients.contains_key(key),
            NodeLabel::Condition => self.conditions.contains_key(key),
            NodeLabel::Medication => self.medications.contains_key(key),
            NodeLabel::BodySystem => self.body_systems.contains_key(key),
        }
    }

    /// Outgoing edges of `kind` from any of `sources`.
    fn hops<N: Clone>(
        &self,
        kind: EdgeKind,
        sources: &BTreeSet<String>,
        nodes: &BTreeMap<String, N>,
    ) -> Vec<Hop<N>> {
        self.edges
            .iter()
            .filter(|((k, from, _), _)| *k == kind && sources.contains(from))
            .map(|((_, from, to), props)| Hop {
                from: from.clone(),
                to: to.clone(),
                props: props.clone(),
                target: nodes.get(to).cloned(),
            })
            .collect()
    }

    /// Keys reached from `sources` over `kind`.
    fn targets_of(&self, kind: EdgeKind, sources: &BTreeSet<String>) -> BTreeSet<String> {
        self.edges
            .keys()
            .filter(|(k, from, _)| *k == kind && sources.contains(from))
            .map(|(_, _, to)| to.clone())
            .collect()
    }

    fn count_edges(&self, kind: EdgeKind) -> usize {
        self.edges.keys().filter(|(k, _, _)| *k == kind).count()
    }
}

/// A [`GraphStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    state: RwLock<GraphState>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_node(&self, node: &Node) -> Result<(), GraphError> {
        let mut state = self.state.write().await;
        match node {
            Node::Patient(p) => {
                state.patients.insert(p.patient_id.clone(), p.clone());
            }
            Node::Condition(c) => {
                state.conditions.insert(c.code.clone(), c.clone());
            }
            Node::Medication(m) => {
                state.medications.insert(m.code.clone(), m.clone());
            }
            Node::BodySystem(b) => {
                state.body_systems.insert(b.name.clone(), b.clone());
            }
        }
        Ok(())
    }

    async fn upsert_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        let mut state = self.state.write().await;
        let (from_label, to_label) = edge.kind.endpoints();
        if !state.contains(from_label, &edge.from) || !state.contains(to_label, &edge.to) {
            return Err(GraphError::DanglingEdge {
                kind: edge.kind,
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        }
        state
            .edges
            .insert((edge.kind, edge.from.clone(), edge.to.clone()), edge.props.clone());
        Ok(())
    }

    async fn contains_node(&self, label: NodeLabel, key: &str) -> Result<bool, GraphError> {
        Ok(self.state.read().await.contains(label, key))
    }

    async fn node_keys(&self, label: NodeLabel) -> Result<Vec<String>, GraphError> {
        let state = self.state.read().await;
        let keys = match label {
            NodeLabel::Patient => state.patients.keys().cloned().collect(),
            NodeLabel::Condition => state.conditions.keys().cloned().collect(),
            NodeLabel::Medication => state.medications.keys().cloned().collect(),
            NodeLabel::BodySystem => state.body_systems.keys().cloned().collect(),
        };
        Ok(keys)
    }

    async fn neighborhood(&self, patient_id: &str) -> Result<Option<Neighborhood>, GraphError> {
        let state = self.state.read().await;
        let Some(patient) = state.patients.get(patient_id) else {
            return Ok(None);
        };

        let start = BTreeSet::from([patient_id.to_string()]);
        let conditions = state.hops(EdgeKind::HasCondition, &start, &state.conditions);
        let medications = state.hops(EdgeKind::TakesMedication, &start, &state.medications);

        let condition_codes = state.targets_of(EdgeKind::HasCondition, &start);
        let medication_codes = state.targets_of(EdgeKind::TakesMedication, &start);

        Ok(Some(Neighborhood {
            patient: patient.clone(),
            affects: state.hops(EdgeKind::Affects, &condition_codes, &state.body_systems),
            treats: state.hops(EdgeKind::Treats, &medication_codes, &state.conditions),
            related: state.hops(EdgeKind::RelatedTo, &condition_codes, &state.conditions),
            conditions,
            medications,
        }))
    }

    async fn patients(
        &self,
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PatientListing>, GraphError> {
        let state = self.state.read().await;
        let needle = filter.map(|f| f.to_lowercase());

        let mut listings: Vec<PatientListing> = state
            .patients
            .values()
            .filter(|p| match &needle {
                Some(needle) => p.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .map(|p| PatientListing {
                id: p.patient_id.clone(),
                name: p.name.clone(),
                gender: p.gender.clone(),
                birth_date: p.birth_date.clone(),
                condition_count: state
                    .edges
                    .keys()
                    .filter(|(k, from, _)| *k == EdgeKind::HasCondition && *from == p.patient_id)
                    .count(),
            })
            .collect();

        listings.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        listings.truncate(limit);
        Ok(listings)
    }

    async fn patient_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Option<Vec<ConditionDetail>>, GraphError> {
        let state = self.state.read().await;
        if !state.patients.contains_key(patient_id) {
            return Ok(None);
        }

        let start = BTreeSet::from([patient_id.to_string()]);
        let codes = state.targets_of(EdgeKind::HasCondition, &start);
        let conditions = state.hops(EdgeKind::HasCondition, &start, &state.conditions);
        let affects = state.hops(EdgeKind::Affects, &codes, &state.body_systems);
        Ok(Some(condition_details(&conditions, &affects)))
    }

    async fn patient_medications(
        &self,
        patient_id: &str,
    ) -> Result<Option<Vec<MedicationDetail>>, GraphError> {
        let state = self.state.read().await;
        if !state.patients.contains_key(patient_id) {
            return Ok(None);
        }

        let start = BTreeSet::from([patient_id.to_string()]);
        let codes = state.targets_of(EdgeKind::TakesMedication, &start);
        let medications = state.hops(EdgeKind::TakesMedication, &start, &state.medications);
        let treats = state.hops(EdgeKind::Treats, &codes, &state.conditions);
        let targets = state.hops(EdgeKind::Targets, &codes, &state.body_systems);
        Ok(Some(medication_details(&medications, &treats, &targets)))
    }

    async fn body_systems(&self) -> Result<Vec<BodySystemNode>, GraphError> {
        // Keyed by name, so already in name order.
        Ok(self.state.read().await.body_systems.values().cloned().collect())
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        let state = self.state.read().await;
        Ok(GraphStats {
            nodes: NodeCounts {
                patients: state.patients.len(),
                conditions: state.conditions.len(),
                medications: state.medications.len(),
                body_systems: state.body_systems.len(),
            },
            edges: EdgeCounts {
                has_condition: state.count_edges(EdgeKind::HasCondition),
                takes_medication: state.count_edges(EdgeKind::TakesMedication),
                affects: state.count_edges(EdgeKind::Affects),
                treats: state.count_edges(EdgeKind::Treats),
                targets: state.count_edges(EdgeKind::Targets),
                related_to: state.count_edges(EdgeKind::RelatedTo),
            },
            captured_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::BodySystem;

    fn patient(id: &str, name: &str) -> Node {
        Node::Patient(PatientNode {
            patient_id: id.to_string(),
            name: name.to_string(),
            birth_date: None,
            gender: None,
        })
    }

    fn condition(code: &str, display: &str) -> Node {
        Node::Condition(ConditionNode {
            code: code.to_string(),
            display: display.to_string(),
            system: None,
        })
    }

    #[tokio::test]
    async fn test_upsert_node_overwrites() {
        let store = MemoryGraphStore::new();
        store.upsert_node(&condition("E11", "Diabetes")).await.unwrap();
        store.upsert_node(&condition("E11", "Type 2 Diabetes")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.nodes.conditions, 1);

        store.upsert_node(&patient("p1", "Ana")).await.unwrap();
        store.upsert_edge(&Edge::has_condition("p1", "E11", None)).await.unwrap();
        let hood = store.neighborhood("p1").await.unwrap().unwrap();
        assert_eq!(hood.conditions[0].target.as_ref().unwrap().display, "Type 2 Diabetes");
    }

    #[tokio::test]
    async fn test_edge_requires_endpoints() {
        let store = MemoryGraphStore::new();
        store.upsert_node(&patient("p1", "Ana")).await.unwrap();

        let err = store
            .upsert_edge(&Edge::has_condition("p1", "E11", None))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { kind: EdgeKind::HasCondition, .. }));

        let err = store
            .upsert_edge(&Edge::affects("E11", BodySystem::Pancreas, "Insulin Production"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { .. }));
        assert_eq!(store.stats().await.unwrap().edges.total(), 0);
    }

    #[tokio::test]
    async fn test_edge_upsert_is_keyed() {
        let store = MemoryGraphStore::new();
        store.upsert_node(&patient("p1", "Ana")).await.unwrap();
        store.upsert_node(&condition("E11", "Diabetes")).await.unwrap();

        store
            .upsert_edge(&Edge::has_condition("p1", "E11", Some("2015-06-20".into())))
            .await
            .unwrap();
        store
            .upsert_edge(&Edge::has_condition("p1", "E11", Some("2016-01-01".into())))
            .await
            .unwrap();

        let hood = store.neighborhood("p1").await.unwrap().unwrap();
        assert_eq!(hood.conditions.len(), 1);
        assert_eq!(hood.conditions[0].props.onset_date.as_deref(), Some("2016-01-01"));
    }

    #[tokio::test]
    async fn test_patients_filter_and_limit() {
        let store = MemoryGraphStore::new();
        store.upsert_node(&patient("p2", "James Wilson")).await.unwrap();
        store.upsert_node(&patient("p1", "Maria Garcia")).await.unwrap();
        store.upsert_node(&patient("p3", "Sarah Johnson")).await.unwrap();

        let all = store.patients(None, 10).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["James Wilson", "Maria Garcia", "Sarah Johnson"]);

        let found = store.patients(Some("GARCIA"), 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p1");

        assert_eq!(store.patients(None, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_patient_neighborhood() {
        let store = MemoryGraphStore::new();
        assert!(store.neighborhood("nobody").await.unwrap().is_none());
        assert!(store.patient_conditions("nobody").await.unwrap().is_none());
        assert!(store.patient_medications("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edge_keys_with_arrows_stay_distinct() {
        let store = MemoryGraphStore::new();
        store.upsert_node(&patient("a->b", "Ana")).await.unwrap();
        store.upsert_node(&patient("a", "Ben")).await.unwrap();
        store.upsert_node(&condition("c", "First")).await.unwrap();
        store.upsert_node(&condition("b->c", "Second")).await.unwrap();

        store.upsert_edge(&Edge::has_condition("a->b", "c", None)).await.unwrap();
        store.upsert_edge(&Edge::has_condition("a", "b->c", None)).await.unwrap();

        assert_eq!(store.stats().await.unwrap().edges.has_condition, 2);
    }

    #[tokio::test]
    async fn test_body_systems_ordered_by_name() {
        let store = MemoryGraphStore::new();
        for system in [BodySystem::Pancreas, BodySystem::Heart, BodySystem::Liver] {
            store
                .upsert_node(&Node::BodySystem(BodySystemNode::from(system)))
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .body_systems()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["Heart", "Liver", "Pancreas"]);
    }
}
