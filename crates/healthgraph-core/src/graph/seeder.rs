//! Body-system taxonomy seeding.

use std::sync::Arc;
use tracing::info;

use super::error::GraphError;
use super::mapper::{self, MatchKind};
use super::models::{BodySystem, BodySystemNode, Edge, Node, NodeLabel};
use super::GraphStore;

/// Counts from one seeding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// BodySystem nodes upserted.
    pub body_systems: usize,
    pub affects_edges: usize,
    pub targets_edges: usize,
    pub related_edges: usize,
    /// Condition and medication codes that fell through to `Unknown`.
    pub unmapped_codes: Vec<String>,
}

/// Creates body systems and wires condition/medication codes to them.
///
/// Every write is an upsert, so seeding can run after each load.
pub struct GraphSeeder {
    store: Arc<dyn GraphStore>,
}

impl GraphSeeder {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn seed(&self) -> Result<SeedReport, GraphError> {
        let mut report = SeedReport::default();

        for system in BodySystem::ALL {
            self.store
                .upsert_node(&Node::BodySystem(BodySystemNode::from(system)))
                .await?;
            report.body_systems += 1;
        }

        let condition_codes = self.store.node_keys(NodeLabel::Condition).await?;
        for code in &condition_codes {
            let mapping = mapper::map_condition_code(code);
            if mapping.matched == MatchKind::Unmapped {
                info!(code = %code, "Unmapped condition code, wiring to Unknown");
                report.unmapped_codes.push(code.clone());
            }
            self.store
                .upsert_edge(&Edge::affects(code, mapping.system, mapping.subsystem))
                .await?;
            report.affects_edges += 1;
        }

        for code in self.store.node_keys(NodeLabel::Medication).await? {
            let target = mapper::map_medication_code(&code);
            if target.matched == MatchKind::Unmapped {
                info!(code = %code, "Unmapped medication code, wiring to Unknown");
                report.unmapped_codes.push(code.clone());
            }
            self.store
                .upsert_edge(&Edge::targets(&code, target.target, target.action))
                .await?;
            report.targets_edges += 1;
        }

        for code in &condition_codes {
            for related in condition_codes.iter().filter(|r| *r != code) {
                if mapper::is_comorbidity(code, related) {
                    self.store.upsert_edge(&Edge::related_to(code, related)).await?;
                    report.related_edges += 1;
                }
            }
        }

        info!(
            body_systems = report.body_systems,
            affects = report.affects_edges,
            targets = report.targets_edges,
            related = report.related_edges,
            unmapped = report.unmapped_codes.len(),
            "Seeding complete"
        );
        Ok(report)
    }
}
