//! Health graph error types.

use std::path::PathBuf;
use thiserror::Error;

use super::models::EdgeKind;

/// Errors that can occur in the health graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph store could not be reached or rejected a query.
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    /// No Patient node exists for the requested id.
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// An edge write referenced a node that does not exist.
    #[error("Cannot write {kind} edge {from} -> {to}: endpoint node missing")]
    DanglingEdge {
        kind: EdgeKind,
        from: String,
        to: String,
    },

    /// A bundle file could not be decoded.
    #[error("Failed to parse bundle {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<surrealdb::Error> for GraphError {
    fn from(err: surrealdb::Error) -> Self {
        GraphError::StoreUnavailable(err.to_string())
    }
}
