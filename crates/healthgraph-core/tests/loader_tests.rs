use healthgraph_core::fhir::{
    Bundle, CodeableConcept, Coding, Condition, HumanName, MedicationRequest, Patient, Reference,
    Resource,
};
use healthgraph_core::graph::{self, GraphError, HealthGraph, SkipReason};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn icd10(code: &str, display: &str) -> CodeableConcept {
    CodeableConcept {
        coding: vec![Coding {
            system: Some("http://hl7.org/fhir/sid/icd-10".to_string()),
            code: Some(code.to_string()),
            display: Some(display.to_string()),
        }],
        text: None,
    }
}

fn patient(id: &str, given: &str, family: &str) -> Resource {
    Resource::Patient(Patient {
        id: Some(id.to_string()),
        name: vec![HumanName {
            family: Some(family.to_string()),
            given: vec![given.to_string()],
        }],
        gender: None,
        birth_date: None,
    })
}

fn condition(patient_id: Option<&str>, code: &str, display: &str) -> Resource {
    Resource::Condition(Condition {
        id: Some(format!("cond-{code}")),
        subject: patient_id.map(|id| Reference::to(format!("Patient/{id}"))),
        code: Some(icd10(code, display)),
        onset_date_time: None,
    })
}

#[tokio::test]
async fn test_load_fixture_counts() {
    let graph = HealthGraph::in_memory();
    let result = graph
        .load_bundle_file(&fixture("diabetes_bundle.json"))
        .await
        .unwrap();

    assert_eq!(result.entries_loaded, 6);
    assert_eq!(result.entries_ignored, 2);
    assert_eq!(result.nodes_written, 6);
    assert_eq!(result.edges_written, 7);

    assert_eq!(result.skipped.len(), 1);
    let skipped = &result.skipped[0];
    assert_eq!(skipped.index, 7);
    assert_eq!(skipped.resource_type, "Condition");
    assert_eq!(skipped.resource_id.as_deref(), Some("cond-orphan"));
    assert_eq!(skipped.reason, SkipReason::MissingSubject);

    let stats = graph.stats().await.unwrap();
    assert_eq!(stats.nodes.patients, 1);
    assert_eq!(stats.nodes.conditions, 3);
    assert_eq!(stats.nodes.medications, 2);
    assert_eq!(stats.edges.has_condition, 3);
    assert_eq!(stats.edges.takes_medication, 2);
    assert_eq!(stats.edges.treats, 2);
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let graph = HealthGraph::in_memory();
    let path = fixture("diabetes_bundle.json");

    graph.load_bundle_file(&path).await.unwrap();
    let first = graph.stats().await.unwrap();
    graph.load_bundle_file(&path).await.unwrap();
    let second = graph.stats().await.unwrap();

    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.edges, second.edges);
}

#[tokio::test]
async fn test_skip_isolation() {
    let mut resources = vec![patient("p1", "Ana", "Lopez")];
    let codes = ["E11", "I10", "E78", "N18", "J45", "F32", "M54", "K21"];
    for code in codes {
        resources.push(condition(Some("p1"), code, code));
    }
    resources.insert(4, condition(None, "I25", "Coronary Artery Disease"));

    let graph = HealthGraph::in_memory();
    let result = graph
        .load_bundle(&Bundle::from_resources(resources))
        .await
        .unwrap();

    assert_eq!(result.entries_loaded, 9);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].index, 4);
    assert_eq!(graph.stats().await.unwrap().edges.has_condition, 8);
}

#[tokio::test]
async fn test_entries_for_unknown_patient_are_skipped() {
    let bundle = Bundle::from_resources([
        condition(Some("p9"), "E11", "Type 2 Diabetes"),
        patient("p9", "Late", "Arrival"),
    ]);

    let graph = HealthGraph::in_memory();
    let result = graph.load_bundle(&bundle).await.unwrap();

    assert_eq!(result.entries_loaded, 1);
    assert_eq!(
        result.skipped[0].reason,
        SkipReason::UnknownPatient("p9".to_string())
    );
    // A skipped entry writes nothing.
    assert_eq!(graph.stats().await.unwrap().nodes.conditions, 0);
}

#[tokio::test]
async fn test_missing_coding_and_malformed_reference() {
    let bundle = Bundle::from_resources([
        patient("p1", "Ana", "Lopez"),
        Resource::Condition(Condition {
            id: Some("c1".to_string()),
            subject: Some(Reference::to("Patient/p1")),
            code: Some(CodeableConcept {
                coding: vec![],
                text: Some("free text only".to_string()),
            }),
            onset_date_time: None,
        }),
        Resource::MedicationRequest(MedicationRequest {
            id: Some("m1".to_string()),
            subject: Some(Reference::to("Patient/")),
            medication_codeable_concept: Some(icd10("A10BA02", "Metformin")),
            ..MedicationRequest::default()
        }),
        Resource::Patient(Patient::default()),
    ]);

    let graph = HealthGraph::in_memory();
    let result = graph.load_bundle(&bundle).await.unwrap();

    let reasons: Vec<SkipReason> = result.skipped.iter().map(|s| s.reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![
            SkipReason::MissingCoding,
            SkipReason::MalformedReference("Patient/".to_string()),
            SkipReason::MissingPatientId,
        ]
    );
    assert_eq!(result.entries_loaded, 1);
}

#[tokio::test]
async fn test_reason_code_creates_missing_condition() {
    let bundle = Bundle::from_resources([
        patient("p1", "Ana", "Lopez"),
        condition(Some("p1"), "E11", "Type 2 diabetes mellitus"),
        Resource::MedicationRequest(MedicationRequest {
            id: Some("m1".to_string()),
            subject: Some(Reference::to("Patient/p1")),
            medication_codeable_concept: Some(icd10("C10AA05", "Atorvastatin")),
            reason_code: vec![icd10("E78", "Hyperlipidemia"), icd10("E11", "T2DM")],
            reason_reference: vec![],
        }),
    ]);

    let graph = HealthGraph::in_memory();
    let result = graph.load_bundle(&bundle).await.unwrap();
    assert!(result.skipped.is_empty());

    let stats = graph.stats().await.unwrap();
    assert_eq!(stats.nodes.conditions, 2);
    assert_eq!(stats.edges.treats, 2);
    // E78 is a treatment target only, not one of the patient's conditions.
    assert_eq!(stats.edges.has_condition, 1);

    let summary = graph.get_summary("p1").await.unwrap();
    assert_eq!(summary.conditions.len(), 1);
    assert_eq!(summary.conditions[0].display, "Type 2 diabetes mellitus");
    let mut treats = summary.medications[0].treats.clone();
    treats.sort();
    assert_eq!(treats, vec!["Hyperlipidemia", "Type 2 diabetes mellitus"]);
}

#[tokio::test]
async fn test_load_directory() {
    let temp_dir = TempDir::new().unwrap();
    fs::copy(fixture("diabetes_bundle.json"), temp_dir.path().join("a.json")).unwrap();
    fs::copy(fixture("cardiac_bundle.json"), temp_dir.path().join("b.json")).unwrap();
    fs::write(temp_dir.path().join("c.json"), "{ not json").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

    let files = graph::bundle_files(temp_dir.path(), "json").unwrap();
    assert_eq!(files.len(), 3);

    let graph = HealthGraph::in_memory();
    let report = graph.load_directory(temp_dir.path(), "json").await.unwrap();

    assert_eq!(report.files_processed, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("c.json"));
    assert_eq!(report.result.entries_loaded, 11);
    assert_eq!(report.result.skipped.len(), 1);

    let stats = graph.stats().await.unwrap();
    assert_eq!(stats.nodes.patients, 2);
    assert_eq!(stats.nodes.conditions, 4);
    assert_eq!(stats.nodes.medications, 3);
    // Both patients' Metformin treats E11 through the same edge.
    assert_eq!(stats.edges.treats, 3);
}

#[test]
fn test_read_bundle_errors() {
    let temp_dir = TempDir::new().unwrap();

    let missing = temp_dir.path().join("missing.json");
    assert!(matches!(graph::read_bundle(&missing), Err(GraphError::Io { .. })));

    let broken = temp_dir.path().join("broken.json");
    fs::write(&broken, "[1, 2").unwrap();
    match graph::read_bundle(&broken) {
        Err(GraphError::Parse { path, .. }) => assert_eq!(path, broken),
        other => panic!("expected parse error, got {:?}", other.map(|b| b.entry.len())),
    }
}
