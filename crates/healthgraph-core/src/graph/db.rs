//! SurrealDB embedded store for the health graph.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;
use tracing::debug;

use super::aggregator::{condition_details, medication_details};
use super::error::GraphError;
use super::models::{
    BodySystemNode, ConditionDetail, ConditionNode, Edge, EdgeCounts, EdgeKind, EdgeProps,
    GraphStats, Hop, MedicationDetail, MedicationNode, Neighborhood, Node, NodeCounts, NodeLabel,
    PatientListing, PatientNode,
};
use super::GraphStore;

/// Edge row. Edges live in plain tables under the array record id
/// `[from, to]` so that re-writing an edge replaces it instead of adding a
/// parallel one.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeRecord {
    from_key: String,
    to_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    onset_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
}

impl EdgeRecord {
    fn from_edge(edge: &Edge) -> Self {
        Self {
            from_key: edge.from.clone(),
            to_key: edge.to.clone(),
            onset_date: edge.props.onset_date.clone(),
            subsystem: edge.props.subsystem.clone(),
            action: edge.props.action.clone(),
        }
    }

    fn into_hop<N: Clone>(self, nodes: &HashMap<String, N>) -> Hop<N> {
        let target = nodes.get(&self.to_key).cloned();
        Hop {
            from: self.from_key,
            to: self.to_key,
            props: EdgeProps {
                onset_date: self.onset_date,
                subsystem: self.subsystem,
                action: self.action,
            },
            target,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyRow {
    key: String,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct ConditionCountRow {
    from_key: String,
    total: i64,
}

const EDGE_FIELDS: &str = "from_key, to_key, onset_date, subsystem, action";

const CONDITIONS_OF: &str = "(SELECT VALUE to_key FROM has_condition WHERE from_key = $id)";
const MEDICATIONS_OF: &str = "(SELECT VALUE to_key FROM takes_medication WHERE from_key = $id)";

fn keyed<N>(nodes: Vec<N>, key: impl Fn(&N) -> &str) -> HashMap<String, N> {
    nodes.into_iter().map(|n| (key(&n).to_string(), n)).collect()
}

fn hops<N: Clone>(edges: Vec<EdgeRecord>, nodes: &HashMap<String, N>) -> Vec<Hop<N>> {
    edges.into_iter().map(|e| e.into_hop(nodes)).collect()
}

/// Graph store backed by SurrealDB with RocksDB persistence.
///
/// Each write is its own transaction and RocksDB commits optimistically.
/// Two writers upserting the same record at the same moment can therefore
/// see one of them fail with a transaction conflict, reported as
/// [`GraphError::StoreUnavailable`]. Every write is an idempotent upsert, so
/// retrying the failed load or seed is safe and converges on the same graph.
/// Multi-statement reads run inside one transaction and see a single snapshot.
pub struct SurrealGraphStore {
    db: Surreal<Db>,
}

impl SurrealGraphStore {
    /// Open or create a database at the given path and ensure the schema.
    pub async fn open(path: &Path, namespace: &str, database: &str) -> Result<Self, GraphError> {
        let db = Surreal::new::<RocksDb>(path).await?;
        db.use_ns(namespace).use_db(database).await?;

        let store = Self { db };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Define node and edge tables with their key indexes.
    async fn initialize_schema(&self) -> Result<(), GraphError> {
        for label in NodeLabel::ALL {
            let table = label.table();
            let key = label.key_field();
            self.db
                .query(format!(
                    "DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;
                     DEFINE INDEX IF NOT EXISTS {table}_key ON {table} FIELDS {key} UNIQUE;"
                ))
                .await?
                .check()?;
        }

        for kind in EdgeKind::ALL {
            let table = kind.table();
            self.db
                .query(format!(
                    "DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;
                     DEFINE INDEX IF NOT EXISTS {table}_from ON {table} FIELDS from_key;
                     DEFINE INDEX IF NOT EXISTS {table}_to ON {table} FIELDS to_key;"
                ))
                .await?
                .check()?;
        }

        Ok(())
    }

    async fn count_table(&self, table: &str) -> Result<usize, GraphError> {
        let result: Option<CountResult> = self
            .db
            .query(format!("SELECT count() FROM {table} GROUP ALL"))
            .await?
            .take(0)?;
        Ok(result.map(|r| r.count as usize).unwrap_or(0))
    }
}

#[async_trait]
impl GraphStore for SurrealGraphStore {
    async fn upsert_node(&self, node: &Node) -> Result<(), GraphError> {
        let label = node.label();
        let query = self
            .db
            .query(format!("UPSERT type::thing('{}', $key) CONTENT $data", label.table()))
            .bind(("key", node.key().to_string()));

        let query = match node {
            Node::Patient(p) => query.bind(("data", p.clone())),
            Node::Condition(c) => query.bind(("data", c.clone())),
            Node::Medication(m) => query.bind(("data", m.clone())),
            Node::BodySystem(b) => query.bind(("data", b.clone())),
        };
        query.await?.check()?;

        debug!(label = %label, key = node.key(), "Node upserted");
        Ok(())
    }

    async fn upsert_edge(&self, edge: &Edge) -> Result<(), GraphError> {
        // Nodes are never deleted, so an endpoint seen here stays present.
        let (from_label, to_label) = edge.kind.endpoints();
        if !self.contains_node(from_label, &edge.from).await?
            || !self.contains_node(to_label, &edge.to).await?
        {
            return Err(GraphError::DanglingEdge {
                kind: edge.kind,
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        }

        self.db
            .query(format!(
                "UPSERT type::thing('{}', [$from, $to]) CONTENT $data",
                edge.kind.table()
            ))
            .bind(("from", edge.from.clone()))
            .bind(("to", edge.to.clone()))
            .bind(("data", EdgeRecord::from_edge(edge)))
            .await?
            .check()?;

        debug!(kind = %edge.kind, from = %edge.from, to = %edge.to, "Edge upserted");
        Ok(())
    }

    async fn contains_node(&self, label: NodeLabel, key: &str) -> Result<bool, GraphError> {
        let rows: Vec<KeyRow> = self
            .db
            .query(format!(
                "SELECT {field} AS key FROM {table} WHERE {field} = $key LIMIT 1",
                field = label.key_field(),
                table = label.table()
            ))
            .bind(("key", key.to_string()))
            .await?
            .take(0)?;
        Ok(!rows.is_empty())
    }

    async fn node_keys(&self, label: NodeLabel) -> Result<Vec<String>, GraphError> {
        let rows: Vec<KeyRow> = self
            .db
            .query(format!(
                "SELECT {field} AS key FROM {table}",
                field = label.key_field(),
                table = label.table()
            ))
            .await?
            .take(0)?;

        let mut keys: Vec<String> = rows.into_iter().map(|r| r.key).collect();
        keys.sort();
        Ok(keys)
    }

    async fn neighborhood(&self, patient_id: &str) -> Result<Option<Neighborhood>, GraphError> {
        // One transaction for the whole pattern so node properties and edges
        // come from the same snapshot. BEGIN and COMMIT yield no results.
        let treated_of =
            format!("(SELECT VALUE to_key FROM treats WHERE from_key IN {MEDICATIONS_OF})");
        let related_of =
            format!("(SELECT VALUE to_key FROM related_to WHERE from_key IN {CONDITIONS_OF})");

        let query = format!(
            r#"
            BEGIN TRANSACTION;
            SELECT patient_id, name, birth_date, gender FROM patient WHERE patient_id = $id;
            SELECT {EDGE_FIELDS} FROM has_condition WHERE from_key = $id;
            SELECT {EDGE_FIELDS} FROM affects WHERE from_key IN {CONDITIONS_OF};
            SELECT {EDGE_FIELDS} FROM takes_medication WHERE from_key = $id;
            SELECT {EDGE_FIELDS} FROM treats WHERE from_key IN {MEDICATIONS_OF};
            SELECT {EDGE_FIELDS} FROM related_to WHERE from_key IN {CONDITIONS_OF};
            SELECT code, display, system FROM condition
                WHERE code IN {CONDITIONS_OF} OR code IN {treated_of} OR code IN {related_of};
            SELECT code, display, system FROM medication WHERE code IN {MEDICATIONS_OF};
            SELECT name, description FROM body_system;
            COMMIT TRANSACTION;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("id", patient_id.to_string()))
            .await?;

        let patient: Option<PatientNode> = response.take(0)?;
        let Some(patient) = patient else {
            return Ok(None);
        };

        let has_condition: Vec<EdgeRecord> = response.take(1)?;
        let affects: Vec<EdgeRecord> = response.take(2)?;
        let takes_medication: Vec<EdgeRecord> = response.take(3)?;
        let treats: Vec<EdgeRecord> = response.take(4)?;
        let related_to: Vec<EdgeRecord> = response.take(5)?;

        let conditions: Vec<ConditionNode> = response.take(6)?;
        let medications: Vec<MedicationNode> = response.take(7)?;
        let body_systems: Vec<BodySystemNode> = response.take(8)?;

        let conditions = keyed(conditions, |c| c.code.as_str());
        let medications = keyed(medications, |m| m.code.as_str());
        let body_systems = keyed(body_systems, |b| b.name.as_str());

        Ok(Some(Neighborhood {
            patient,
            conditions: hops(has_condition, &conditions),
            affects: hops(affects, &body_systems),
            medications: hops(takes_medication, &medications),
            treats: hops(treats, &conditions),
            related: hops(related_to, &conditions),
        }))
    }

    async fn patient_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Option<Vec<ConditionDetail>>, GraphError> {
        let query = format!(
            r#"
            BEGIN TRANSACTION;
            SELECT patient_id AS key FROM patient WHERE patient_id = $id;
            SELECT {EDGE_FIELDS} FROM has_condition WHERE from_key = $id;
            SELECT {EDGE_FIELDS} FROM affects WHERE from_key IN {CONDITIONS_OF};
            SELECT code, display, system FROM condition WHERE code IN {CONDITIONS_OF};
            SELECT name, description FROM body_system;
            COMMIT TRANSACTION;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("id", patient_id.to_string()))
            .await?;

        let patient: Option<KeyRow> = response.take(0)?;
        if patient.is_none() {
            return Ok(None);
        }

        let has_condition: Vec<EdgeRecord> = response.take(1)?;
        let affects: Vec<EdgeRecord> = response.take(2)?;
        let conditions: Vec<ConditionNode> = response.take(3)?;
        let body_systems: Vec<BodySystemNode> = response.take(4)?;

        let conditions = keyed(conditions, |c| c.code.as_str());
        let body_systems = keyed(body_systems, |b| b.name.as_str());

        Ok(Some(condition_details(
            &hops(has_condition, &conditions),
            &hops(affects, &body_systems),
        )))
    }

    async fn patient_medications(
        &self,
        patient_id: &str,
    ) -> Result<Option<Vec<MedicationDetail>>, GraphError> {
        let treated_of =
            format!("(SELECT VALUE to_key FROM treats WHERE from_key IN {MEDICATIONS_OF})");

        let query = format!(
            r#"
            BEGIN TRANSACTION;
            SELECT patient_id AS key FROM patient WHERE patient_id = $id;
            SELECT {EDGE_FIELDS} FROM takes_medication WHERE from_key = $id;
            SELECT {EDGE_FIELDS} FROM treats WHERE from_key IN {MEDICATIONS_OF};
            SELECT {EDGE_FIELDS} FROM targets WHERE from_key IN {MEDICATIONS_OF};
            SELECT code, display, system FROM medication WHERE code IN {MEDICATIONS_OF};
            SELECT code, display, system FROM condition WHERE code IN {treated_of};
            SELECT name, description FROM body_system;
            COMMIT TRANSACTION;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("id", patient_id.to_string()))
            .await?;

        let patient: Option<KeyRow> = response.take(0)?;
        if patient.is_none() {
            return Ok(None);
        }

        let takes_medication: Vec<EdgeRecord> = response.take(1)?;
        let treats: Vec<EdgeRecord> = response.take(2)?;
        let targets: Vec<EdgeRecord> = response.take(3)?;
        let medications: Vec<MedicationNode> = response.take(4)?;
        let conditions: Vec<ConditionNode> = response.take(5)?;
        let body_systems: Vec<BodySystemNode> = response.take(6)?;

        let medications = keyed(medications, |m| m.code.as_str());
        let conditions = keyed(conditions, |c| c.code.as_str());
        let body_systems = keyed(body_systems, |b| b.name.as_str());

        Ok(Some(medication_details(
            &hops(takes_medication, &medications),
            &hops(treats, &conditions),
            &hops(targets, &body_systems),
        )))
    }

    async fn body_systems(&self) -> Result<Vec<BodySystemNode>, GraphError> {
        let systems: Vec<BodySystemNode> = self
            .db
            .query("SELECT name, description FROM body_system ORDER BY name")
            .await?
            .take(0)?;
        Ok(systems)
    }

    async fn patients(
        &self,
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PatientListing>, GraphError> {
        // LIMIT must be a literal, format it directly
        let condition = if filter.is_some() {
            "WHERE string::lowercase(name) CONTAINS $needle"
        } else {
            ""
        };
        let query = format!(
            r#"
            SELECT patient_id, name, birth_date, gender FROM patient {condition}
                ORDER BY name, patient_id LIMIT {limit};
            SELECT from_key, count() AS total FROM has_condition GROUP BY from_key;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("needle", filter.unwrap_or_default().to_lowercase()))
            .await?;

        let patients: Vec<PatientNode> = response.take(0)?;
        let counts: Vec<ConditionCountRow> = response.take(1)?;
        let counts: HashMap<String, usize> = counts
            .into_iter()
            .map(|row| (row.from_key, row.total as usize))
            .collect();

        Ok(patients
            .into_iter()
            .map(|p| PatientListing {
                condition_count: counts.get(&p.patient_id).copied().unwrap_or(0),
                id: p.patient_id,
                name: p.name,
                gender: p.gender,
                birth_date: p.birth_date,
            })
            .collect())
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        Ok(GraphStats {
            nodes: NodeCounts {
                patients: self.count_table(NodeLabel::Patient.table()).await?,
                conditions: self.count_table(NodeLabel::Condition.table()).await?,
                medications: self.count_table(NodeLabel::Medication.table()).await?,
                body_systems: self.count_table(NodeLabel::BodySystem.table()).await?,
            },
            edges: EdgeCounts {
                has_condition: self.count_table(EdgeKind::HasCondition.table()).await?,
                takes_medication: self.count_table(EdgeKind::TakesMedication.table()).await?,
                affects: self.count_table(EdgeKind::Affects.table()).await?,
                treats: self.count_table(EdgeKind::Treats.table()).await?,
                targets: self.count_table(EdgeKind::Targets.table()).await?,
                related_to: self.count_table(EdgeKind::RelatedTo.table()).await?,
            },
            captured_at: chrono::Utc::now(),
        })
    }
}
