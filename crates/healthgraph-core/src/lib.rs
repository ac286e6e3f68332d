pub mod config;
pub mod fhir;
pub mod graph;

pub use config::{Config, ConfigError, StoreBackend, StoreConfig};
pub use graph::{
    ConditionDetail, GraphError, GraphStats, HealthGraph, LoadResult, MedicationDetail,
    PatientHealthSummary, PatientListing, SeedReport,
};
