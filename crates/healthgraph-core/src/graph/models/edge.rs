//! Edge types and traversal results for the health graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BodySystem, BodySystemNode, ConditionNode, MedicationNode, NodeLabel, PatientNode};

/// Relationship type between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Patient -> Condition, carries the onset date.
    HasCondition,
    /// Patient -> Medication.
    TakesMedication,
    /// Condition -> BodySystem, carries the subsystem label.
    Affects,
    /// Medication -> Condition.
    Treats,
    /// Medication -> BodySystem, carries the action label.
    Targets,
    /// Condition -> Condition comorbidity.
    RelatedTo,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 6] = [
        EdgeKind::HasCondition,
        EdgeKind::TakesMedication,
        EdgeKind::Affects,
        EdgeKind::Treats,
        EdgeKind::Targets,
        EdgeKind::RelatedTo,
    ];

    /// Storage table name.
    pub fn table(&self) -> &'static str {
        match self {
            EdgeKind::HasCondition => "has_condition",
            EdgeKind::TakesMedication => "takes_medication",
            EdgeKind::Affects => "affects",
            EdgeKind::Treats => "treats",
            EdgeKind::Targets => "targets",
            EdgeKind::RelatedTo => "related_to",
        }
    }

    /// Labels of the (from, to) endpoints.
    pub fn endpoints(&self) -> (NodeLabel, NodeLabel) {
        match self {
            EdgeKind::HasCondition => (NodeLabel::Patient, NodeLabel::Condition),
            EdgeKind::TakesMedication => (NodeLabel::Patient, NodeLabel::Medication),
            EdgeKind::Affects => (NodeLabel::Condition, NodeLabel::BodySystem),
            EdgeKind::Treats => (NodeLabel::Medication, NodeLabel::Condition),
            EdgeKind::Targets => (NodeLabel::Medication, NodeLabel::BodySystem),
            EdgeKind::RelatedTo => (NodeLabel::Condition, NodeLabel::Condition),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeKind::HasCondition => "HAS_CONDITION",
            EdgeKind::TakesMedication => "TAKES_MEDICATION",
            EdgeKind::Affects => "AFFECTS",
            EdgeKind::Treats => "TREATS",
            EdgeKind::Targets => "TARGETS",
            EdgeKind::RelatedTo => "RELATED_TO",
        };
        f.write_str(name)
    }
}

/// Properties stored on an edge. Each edge kind uses at most one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// An edge write. Identity is `(kind, from, to)`; props are overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub kind: EdgeKind,
    pub from: String,
    pub to: String,
    pub props: EdgeProps,
}

impl Edge {
    fn new(kind: EdgeKind, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind,
            from: from.into(),
            to: to.into(),
            props: EdgeProps::default(),
        }
    }

    pub fn has_condition(
        patient_id: impl Into<String>,
        code: impl Into<String>,
        onset_date: Option<String>,
    ) -> Self {
        let mut edge = Self::new(EdgeKind::HasCondition, patient_id, code);
        edge.props.onset_date = onset_date;
        edge
    }

    pub fn takes_medication(patient_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(EdgeKind::TakesMedication, patient_id, code)
    }

    pub fn affects(
        code: impl Into<String>,
        system: BodySystem,
        subsystem: impl Into<String>,
    ) -> Self {
        let mut edge = Self::new(EdgeKind::Affects, code, system.name());
        edge.props.subsystem = Some(subsystem.into());
        edge
    }

    pub fn treats(medication_code: impl Into<String>, condition_code: impl Into<String>) -> Self {
        Self::new(EdgeKind::Treats, medication_code, condition_code)
    }

    pub fn targets(
        medication_code: impl Into<String>,
        system: BodySystem,
        action: impl Into<String>,
    ) -> Self {
        let mut edge = Self::new(EdgeKind::Targets, medication_code, system.name());
        edge.props.action = Some(action.into());
        edge
    }

    pub fn related_to(code: impl Into<String>, related_code: impl Into<String>) -> Self {
        Self::new(EdgeKind::RelatedTo, code, related_code)
    }
}

/// One traversed edge with its (possibly missing) target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop<N> {
    pub from: String,
    pub to: String,
    pub props: EdgeProps,
    /// `None` when the store could not join the edge to its target node.
    pub target: Option<N>,
}

/// A patient's graph neighborhood as returned by a single store read.
///
/// `affects` and `related` start at the patient's conditions, `treats`
/// starts at the patient's medications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    pub patient: PatientNode,
    pub conditions: Vec<Hop<ConditionNode>>,
    pub affects: Vec<Hop<BodySystemNode>>,
    pub medications: Vec<Hop<MedicationNode>>,
    pub treats: Vec<Hop<ConditionNode>>,
    pub related: Vec<Hop<ConditionNode>>,
}

impl Neighborhood {
    /// A neighborhood with no outgoing hops.
    pub fn empty(patient: PatientNode) -> Self {
        Self {
            patient,
            conditions: Vec::new(),
            affects: Vec::new(),
            medications: Vec::new(),
            treats: Vec::new(),
            related: Vec::new(),
        }
    }
}
