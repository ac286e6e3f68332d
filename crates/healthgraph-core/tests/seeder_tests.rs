use healthgraph_core::graph::models::BodySystem;
use healthgraph_core::graph::HealthGraph;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn loaded_graph() -> HealthGraph {
    let graph = HealthGraph::in_memory();
    graph.load_bundle_file(&fixture("diabetes_bundle.json")).await.unwrap();
    graph.load_bundle_file(&fixture("cardiac_bundle.json")).await.unwrap();
    graph
}

#[tokio::test]
async fn test_seed_report() {
    let graph = loaded_graph().await;
    let report = graph.seed().await.unwrap();

    assert_eq!(report.body_systems, BodySystem::ALL.len());
    // E11, I10, Z99, I25.10
    assert_eq!(report.affects_edges, 4);
    // A10BA02, C09AA03, C10AA05
    assert_eq!(report.targets_edges, 3);
    // E11 -> I10, E11 -> I25.10, I10 -> I25.10
    assert_eq!(report.related_edges, 3);
    assert_eq!(report.unmapped_codes, vec!["Z99".to_string()]);
}

#[tokio::test]
async fn test_seed_twice_yields_same_graph() {
    let graph = loaded_graph().await;

    graph.seed().await.unwrap();
    let first = graph.stats().await.unwrap();
    graph.seed().await.unwrap();
    let second = graph.stats().await.unwrap();

    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.edges, second.edges);
    assert_eq!(second.nodes.body_systems, BodySystem::ALL.len());
}

#[tokio::test]
async fn test_unmapped_code_seeds_as_unknown() {
    let graph = loaded_graph().await;
    graph.seed().await.unwrap();

    let summary = graph.get_summary("p1").await.unwrap();
    let systems: Vec<&str> = summary
        .body_systems_affected
        .iter()
        .map(|b| b.system.as_str())
        .collect();

    assert!(systems.contains(&"Unknown"));
    assert!(systems.contains(&"Pancreas"));
    assert!(systems.contains(&"Heart"));
}

#[tokio::test]
async fn test_seed_after_new_load_extends_graph() {
    let graph = HealthGraph::in_memory();
    graph.load_bundle_file(&fixture("diabetes_bundle.json")).await.unwrap();
    let first = graph.seed().await.unwrap();
    assert_eq!(first.affects_edges, 3);

    graph.load_bundle_file(&fixture("cardiac_bundle.json")).await.unwrap();
    graph.seed().await.unwrap();

    let stats = graph.stats().await.unwrap();
    assert_eq!(stats.edges.affects, 4);
    assert_eq!(stats.edges.targets, 3);
    assert_eq!(stats.edges.related_to, 3);
}
