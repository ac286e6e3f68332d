use healthgraph_core::config::{StoreBackend, StoreConfig};
use healthgraph_core::graph::models::{ConditionNode, Edge, EdgeKind, Node, NodeLabel, PatientNode};
use healthgraph_core::graph::{GraphError, GraphStore, HealthGraph, SurrealGraphStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn create_test_store() -> (Arc<SurrealGraphStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SurrealGraphStore::open(&temp_dir.path().join("graph.db"), "test", "test")
        .await
        .unwrap();
    (Arc::new(store), temp_dir)
}

#[tokio::test]
async fn test_node_upsert_and_keys() {
    let (store, _temp_dir) = create_test_store().await;

    for display in ["Diabetes", "Type 2 Diabetes"] {
        store
            .upsert_node(&Node::Condition(ConditionNode {
                code: "E11".to_string(),
                display: display.to_string(),
                system: None,
            }))
            .await
            .unwrap();
    }

    assert!(store.contains_node(NodeLabel::Condition, "E11").await.unwrap());
    assert!(!store.contains_node(NodeLabel::Condition, "I10").await.unwrap());
    assert_eq!(store.node_keys(NodeLabel::Condition).await.unwrap(), vec!["E11"]);
    assert_eq!(store.stats().await.unwrap().nodes.conditions, 1);
}

#[tokio::test]
async fn test_dangling_edge_rejected() {
    let (store, _temp_dir) = create_test_store().await;
    store
        .upsert_node(&Node::Patient(PatientNode {
            patient_id: "p1".to_string(),
            name: "Ana Lopez".to_string(),
            birth_date: None,
            gender: None,
        }))
        .await
        .unwrap();

    let err = store
        .upsert_edge(&Edge::has_condition("p1", "E11", None))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::DanglingEdge { kind: EdgeKind::HasCondition, .. }));
    assert_eq!(store.stats().await.unwrap().edges.total(), 0);
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let (store, _temp_dir) = create_test_store().await;
    let graph = HealthGraph::new(store);
    let path = fixture("diabetes_bundle.json");

    graph.load_bundle_file(&path).await.unwrap();
    graph.seed().await.unwrap();
    let first = graph.stats().await.unwrap();

    graph.load_bundle_file(&path).await.unwrap();
    graph.seed().await.unwrap();
    let second = graph.stats().await.unwrap();

    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.edges, second.edges);
    assert_eq!(second.nodes.conditions, 3);
    assert_eq!(second.edges.has_condition, 3);
    assert_eq!(second.edges.treats, 2);
}

#[tokio::test]
async fn test_summary_scenario() {
    let (store, _temp_dir) = create_test_store().await;
    let graph = HealthGraph::new(store);
    graph.load_bundle_file(&fixture("diabetes_bundle.json")).await.unwrap();
    graph.load_bundle_file(&fixture("cardiac_bundle.json")).await.unwrap();
    graph.seed().await.unwrap();

    let summary = graph.get_summary("p1").await.unwrap();
    assert_eq!(summary.patient_name, "Maria Garcia");
    assert_eq!(summary.conditions.len(), 3);

    let metformin = summary
        .medications
        .iter()
        .find(|m| m.code == "A10BA02")
        .unwrap();
    assert_eq!(metformin.treats, vec!["Type 2 Diabetes".to_string()]);

    let mut systems: Vec<&str> = summary
        .body_systems_affected
        .iter()
        .map(|b| b.system.as_str())
        .collect();
    systems.sort();
    assert_eq!(systems, vec!["Heart", "Pancreas", "Unknown"]);

    assert_eq!(summary.condition_relationships.len(), 1);

    assert!(matches!(
        graph.get_summary("nobody").await,
        Err(GraphError::PatientNotFound(_))
    ));
}

#[tokio::test]
async fn test_patient_listing() {
    let (store, _temp_dir) = create_test_store().await;
    let graph = HealthGraph::new(store);
    graph.load_bundle_file(&fixture("diabetes_bundle.json")).await.unwrap();
    graph.load_bundle_file(&fixture("cardiac_bundle.json")).await.unwrap();

    let patients = graph.list_patients(10).await.unwrap();
    let ids: Vec<&str> = patients.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
    assert_eq!(patients[1].condition_count, 3);

    let found = graph.search_patients("garcia", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "p1");
}

#[tokio::test]
async fn test_open_from_config_creates_parent_dir() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("graph.db");
    let config = StoreConfig {
        backend: StoreBackend::Surreal,
        path: db_path.display().to_string(),
        namespace: "test".to_string(),
        database: "config".to_string(),
    };

    let graph = HealthGraph::open(&config).await.unwrap();
    assert!(temp_dir.path().join("nested").is_dir());

    graph.load_bundle_file(&fixture("cardiac_bundle.json")).await.unwrap();
    let stats = graph.stats().await.unwrap();
    assert_eq!(stats.nodes.patients, 1);
    assert_eq!(stats.nodes.conditions, 2);
}

#[tokio::test]
async fn test_detail_queries() {
    let (store, _temp_dir) = create_test_store().await;
    let graph = HealthGraph::new(store);
    graph.load_bundle_file(&fixture("diabetes_bundle.json")).await.unwrap();
    graph.seed().await.unwrap();

    let conditions = graph.patient_conditions("p1").await.unwrap();
    let e11 = conditions.iter().find(|c| c.code == "E11").unwrap();
    assert_eq!(e11.onset.as_deref(), Some("2015-06-20"));
    assert_eq!(e11.body_systems.len(), 1);
    assert_eq!(e11.body_systems[0].system, "Pancreas");
    assert_eq!(e11.body_systems[0].subsystem.as_deref(), Some("Insulin Production"));

    let medications = graph.patient_medications("p1").await.unwrap();
    let metformin = medications.iter().find(|m| m.code == "A10BA02").unwrap();
    assert_eq!(metformin.treats, vec!["Type 2 Diabetes".to_string()]);
    assert_eq!(metformin.targets.len(), 1);
    assert_eq!(metformin.targets[0].system, "Liver");
    assert_eq!(metformin.targets[0].action.as_deref(), Some("Reduces glucose production"));

    let systems = graph.body_systems().await.unwrap();
    assert_eq!(systems.len(), 22);
    let names: Vec<&str> = systems.iter().map(|b| b.system.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    assert!(matches!(
        graph.patient_medications("nobody").await,
        Err(GraphError::PatientNotFound(_))
    ));
}

#[tokio::test]
async fn test_edge_keys_with_arrows_stay_distinct() {
    let (store, _temp_dir) = create_test_store().await;
    for (id, name) in [("a->b", "Ana Lopez"), ("a", "Ben Ortiz")] {
        store
            .upsert_node(&Node::Patient(PatientNode {
                patient_id: id.to_string(),
                name: name.to_string(),
                birth_date: None,
                gender: None,
            }))
            .await
            .unwrap();
    }
    for code in ["c", "b->c"] {
        store
            .upsert_node(&Node::Condition(ConditionNode {
                code: code.to_string(),
                display: code.to_string(),
                system: None,
            }))
            .await
            .unwrap();
    }

    store.upsert_edge(&Edge::has_condition("a->b", "c", None)).await.unwrap();
    store.upsert_edge(&Edge::has_condition("a", "b->c", None)).await.unwrap();

    assert_eq!(store.stats().await.unwrap().edges.has_condition, 2);
    let hood = store.neighborhood("a").await.unwrap().unwrap();
    assert_eq!(hood.conditions.len(), 1);
    assert_eq!(hood.conditions[0].to, "b->c");
}
