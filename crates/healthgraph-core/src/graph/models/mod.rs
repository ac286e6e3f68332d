//! Data models for the health graph.

mod body_system;
mod edge;
mod node;
mod summary;

pub use body_system::BodySystem;
pub use edge::{Edge, EdgeKind, EdgeProps, Hop, Neighborhood};
pub use node::{BodySystemNode, ConditionNode, MedicationNode, Node, NodeLabel, PatientNode};
pub use summary::{
    AffectedSystem, BodySystemSummary, ConditionDetail, ConditionRelationship, ConditionSummary,
    EdgeCounts, GraphStats, MedicationDetail, MedicationSummary, NodeCounts, PatientHealthSummary,
    PatientListing, TargetedSystem,
};
