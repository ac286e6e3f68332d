//! Node types for the health graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::BodySystem;

/// Label of a node table in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeLabel {
    Patient,
    Condition,
    Medication,
    BodySystem,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 4] = [
        NodeLabel::Patient,
        NodeLabel::Condition,
        NodeLabel::Medication,
        NodeLabel::BodySystem,
    ];

    /// Storage table name.
    pub fn table(&self) -> &'static str {
        match self {
            NodeLabel::Patient => "patient",
            NodeLabel::Condition => "condition",
            NodeLabel::Medication => "medication",
            NodeLabel::BodySystem => "body_system",
        }
    }

    /// Field holding the natural key in the node table.
    pub fn key_field(&self) -> &'static str {
        match self {
            NodeLabel::Patient => "patient_id",
            NodeLabel::Condition | NodeLabel::Medication => "code",
            NodeLabel::BodySystem => "name",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeLabel::Patient => "Patient",
            NodeLabel::Condition => "Condition",
            NodeLabel::Medication => "Medication",
            NodeLabel::BodySystem => "BodySystem",
        };
        f.write_str(label)
    }
}

/// A patient node, keyed by the source system's patient id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientNode {
    pub patient_id: String,
    /// First given name plus family name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// A condition node, shared by every patient coded with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionNode {
    /// Clinical code (ICD-10, SNOMED, ...).
    pub code: String,
    pub display: String,
    /// Coding system URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// A medication node, shared by every patient taking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationNode {
    /// Medication code (ATC, RxNorm, ...).
    pub code: String,
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// A body-system node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySystemNode {
    pub name: String,
    pub description: String,
}

impl From<BodySystem> for BodySystemNode {
    fn from(system: BodySystem) -> Self {
        Self {
            name: system.name().to_string(),
            description: system.description().to_string(),
        }
    }
}

/// Any node that can be written to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Patient(PatientNode),
    Condition(ConditionNode),
    Medication(MedicationNode),
    BodySystem(BodySystemNode),
}

impl Node {
    pub fn label(&self) -> NodeLabel {
        match self {
            Node::Patient(_) => NodeLabel::Patient,
            Node::Condition(_) => NodeLabel::Condition,
            Node::Medication(_) => NodeLabel::Medication,
            Node::BodySystem(_) => NodeLabel::BodySystem,
        }
    }

    /// Natural key of the node within its label.
    pub fn key(&self) -> &str {
        match self {
            Node::Patient(p) => &p.patient_id,
            Node::Condition(c) => &c.code,
            Node::Medication(m) => &m.code,
            Node::BodySystem(b) => &b.name,
        }
    }
}

impl From<PatientNode> for Node {
    fn from(node: PatientNode) -> Self {
        Node::Patient(node)
    }
}

impl From<ConditionNode> for Node {
    fn from(node: ConditionNode) -> Self {
        Node::Condition(node)
    }
}

impl From<MedicationNode> for Node {
    fn from(node: MedicationNode) -> Self {
        Node::Medication(node)
    }
}

impl From<BodySystemNode> for Node {
    fn from(node: BodySystemNode) -> Self {
        Node::BodySystem(node)
    }
}
