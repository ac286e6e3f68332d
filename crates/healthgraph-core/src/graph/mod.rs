//! Clinical knowledge graph.
//!
//! This module turns FHIR bundles into a typed graph and reads it back as
//! per-patient health summaries:
//! - **Loading** of Patient, Condition and MedicationRequest entries as
//!   idempotent node/edge upserts
//! - **Seeding** of the fixed body-system taxonomy and category edges
//! - **Aggregation** of a patient's neighborhood into one de-duplicated
//!   summary
//!
//! # Components
//!
//! - [`HealthGraph`] - Facade owning the store handle
//! - [`GraphStore`] - Upsert/read interface every backend implements
//! - [`SurrealGraphStore`] - SurrealDB embedded store (RocksDB)
//! - [`MemoryGraphStore`] - In-memory store for tests and dry runs
//! - [`GraphLoader`], [`GraphSeeder`], [`SummaryAggregator`]
//!
//! # Graph shape
//!
//! ```text
//! (Patient)-[:HAS_CONDITION {onset_date}]->(Condition)-[:AFFECTS {subsystem}]->(BodySystem)
//! (Patient)-[:TAKES_MEDICATION]->(Medication)-[:TARGETS {action}]->(BodySystem)
//! (Medication)-[:TREATS]->(Condition)-[:RELATED_TO]->(Condition)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use healthgraph_core::graph::HealthGraph;
//!
//! let graph = HealthGraph::in_memory();
//! graph.load_bundle_file("bundle.json".as_ref()).await?;
//! graph.seed().await?;
//!
//! let summary = graph.get_summary("p1").await?;
//! ```

mod aggregator;
mod db;
mod error;
mod loader;
pub mod mapper;
mod memory;
pub mod models;
mod seeder;

pub use aggregator::{distinct_present, SummaryAggregator};
pub use db::SurrealGraphStore;
pub use error::GraphError;
pub use loader::{GraphLoader, LoadResult, SkipReason, SkippedEntry};
pub use memory::MemoryGraphStore;
pub use models::{
    BodySystemSummary, ConditionDetail, GraphStats, MedicationDetail, PatientHealthSummary,
    PatientListing,
};
pub use seeder::{GraphSeeder, SeedReport};

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{StoreBackend, StoreConfig};
use crate::fhir::Bundle;
use models::{BodySystemNode, Edge, Neighborhood, Node, NodeLabel};

/// Storage interface for the health graph.
///
/// Every write is an upsert keyed by natural identity, so repeated and
/// concurrent writes of the same data converge on the same graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Match a node by label and key, create it if absent, then overwrite its
    /// properties.
    async fn upsert_node(&self, node: &Node) -> Result<(), GraphError>;

    /// Match an edge by kind and endpoints, create it if absent, then overwrite
    /// its properties.
    ///
    /// Fails with [`GraphError::DanglingEdge`] when either endpoint node is missing.
    async fn upsert_edge(&self, edge: &Edge) -> Result<(), GraphError>;

    /// Check whether a node exists.
    async fn contains_node(&self, label: NodeLabel, key: &str) -> Result<bool, GraphError>;

    /// Natural keys of every node with the given label, sorted.
    async fn node_keys(&self, label: NodeLabel) -> Result<Vec<String>, GraphError>;

    /// Read a patient's neighborhood in one request. `None` if the patient is absent.
    async fn neighborhood(&self, patient_id: &str) -> Result<Option<Neighborhood>, GraphError>;

    /// Patients ordered by name, optionally filtered by a case-insensitive name substring.
    async fn patients(
        &self,
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PatientListing>, GraphError>;

    /// A patient's conditions joined to the body systems they affect.
    /// `None` if the patient is absent.
    async fn patient_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Option<Vec<ConditionDetail>>, GraphError>;

    /// A patient's medications joined to the conditions they treat and the
    /// body systems they target. `None` if the patient is absent.
    async fn patient_medications(
        &self,
        patient_id: &str,
    ) -> Result<Option<Vec<MedicationDetail>>, GraphError>;

    /// Every body system node, ordered by name.
    async fn body_systems(&self) -> Result<Vec<BodySystemNode>, GraphError>;

    /// Node and edge counts.
    async fn stats(&self) -> Result<GraphStats, GraphError>;
}

/// Outcome of loading every bundle file in a directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoadReport {
    /// Files loaded without error.
    pub files_processed: usize,
    /// Files that could not be read, parsed or written, with the error message.
    pub failed: Vec<(PathBuf, String)>,
    /// Merged result over every processed file.
    pub result: LoadResult,
}

/// The main health graph facade.
#[derive(Clone)]
pub struct HealthGraph {
    store: Arc<dyn GraphStore>,
}

impl HealthGraph {
    /// Wrap an existing store.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// A graph backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryGraphStore::new()))
    }

    /// Open the store described by the configuration.
    pub async fn open(config: &StoreConfig) -> Result<Self, GraphError> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::Surreal => {
                let path = config.db_path();
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent).map_err(|e| GraphError::io(parent, e))?;
                    }
                }
                let store =
                    SurrealGraphStore::open(&path, &config.namespace, &config.database).await?;
                Ok(Self::new(Arc::new(store)))
            }
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    pub fn loader(&self) -> GraphLoader {
        GraphLoader::new(self.store())
    }

    pub fn seeder(&self) -> GraphSeeder {
        GraphSeeder::new(self.store())
    }

    pub fn aggregator(&self) -> SummaryAggregator {
        SummaryAggregator::new(self.store())
    }

    /// Load one parsed bundle.
    pub async fn load_bundle(&self, bundle: &Bundle) -> Result<LoadResult, GraphError> {
        self.loader().load_bundle(bundle).await
    }

    /// Read, parse and load one bundle file.
    pub async fn load_bundle_file(&self, path: &Path) -> Result<LoadResult, GraphError> {
        let bundle = read_bundle(path)?;
        self.load_bundle(&bundle).await
    }

    /// Load every bundle file in a directory, in name order.
    ///
    /// A file that fails is recorded in the report and the rest still load.
    pub async fn load_directory(
        &self,
        dir: &Path,
        extension: &str,
    ) -> Result<DirectoryLoadReport, GraphError> {
        let files = bundle_files(dir, extension)?;
        Ok(self.load_files(files, |_| {}).await)
    }

    /// Load the given bundle files in order, calling `on_file` after each one.
    pub async fn load_files(
        &self,
        files: impl IntoIterator<Item = PathBuf>,
        mut on_file: impl FnMut(&Path),
    ) -> DirectoryLoadReport {
        let mut report = DirectoryLoadReport::default();

        for path in files {
            let outcome = self.load_bundle_file(&path).await;
            on_file(path.as_path());
            match outcome {
                Ok(result) => {
                    info!(file = %path.display(), loaded = result.entries_loaded, "Bundle loaded");
                    report.files_processed += 1;
                    report.result.merge(result);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Bundle failed to load");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        report
    }

    /// Create body systems and wire category and comorbidity edges.
    pub async fn seed(&self) -> Result<SeedReport, GraphError> {
        self.seeder().seed().await
    }

    /// Health summary for one patient.
    pub async fn get_summary(&self, patient_id: &str) -> Result<PatientHealthSummary, GraphError> {
        self.aggregator().get_summary(patient_id).await
    }

    /// Patients ordered by name.
    pub async fn list_patients(&self, limit: usize) -> Result<Vec<PatientListing>, GraphError> {
        self.aggregator().list_patients(limit).await
    }

    /// Patients whose name contains `term`, case-insensitively.
    pub async fn search_patients(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<PatientListing>, GraphError> {
        self.aggregator().search_patients(term, limit).await
    }

    /// A patient's conditions with their affected body systems.
    pub async fn patient_conditions(
        &self,
        patient_id: &str,
    ) -> Result<Vec<ConditionDetail>, GraphError> {
        self.aggregator().patient_conditions(patient_id).await
    }

    /// A patient's medications with treated conditions and targeted body systems.
    pub async fn patient_medications(
        &self,
        patient_id: &str,
    ) -> Result<Vec<MedicationDetail>, GraphError> {
        self.aggregator().patient_medications(patient_id).await
    }

    /// Every body system, ordered by name.
    pub async fn body_systems(&self) -> Result<Vec<BodySystemSummary>, GraphError> {
        self.aggregator().body_systems().await
    }

    /// Node and edge counts.
    pub async fn stats(&self) -> Result<GraphStats, GraphError> {
        self.store.stats().await
    }
}

/// Read and parse a FHIR bundle file.
pub fn read_bundle(path: &Path) -> Result<Bundle, GraphError> {
    let json = fs::read_to_string(path).map_err(|e| GraphError::io(path, e))?;
    Bundle::from_json(&json).map_err(|e| GraphError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Bundle files directly inside `dir` with the given extension, sorted by name.
pub fn bundle_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, GraphError> {
    let entries = fs::read_dir(dir).map_err(|e| GraphError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| GraphError::io(dir, e))?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if path.is_file() && matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
