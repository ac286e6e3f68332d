//! Default values for healthgraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// File Locations
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "healthgraph.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "healthgraph";

/// File name inside [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Store Defaults
// ============================================================================

/// On-disk database location (RocksDB directory).
pub const DEFAULT_DB_PATH: &str = ".healthgraph/graph.db";

/// SurrealDB namespace.
pub const DEFAULT_NAMESPACE: &str = "healthgraph";

/// SurrealDB database name.
pub const DEFAULT_DATABASE: &str = "clinical";

// ============================================================================
// Loader Defaults
// ============================================================================

/// Extension of bundle files picked up when loading a directory.
pub const DEFAULT_BUNDLE_EXTENSION: &str = "json";

// ============================================================================
// Summary Defaults
// ============================================================================

/// Rows returned by patient listing and search.
pub const DEFAULT_PATIENT_LIMIT: usize = 100;

// ============================================================================
// Logging Defaults
// ============================================================================

/// `tracing` filter directive used when neither config nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_FILTER: &str = "healthgraph=info,warn";

// ============================================================================
// Environment Variables
// ============================================================================

pub const ENV_STORE: &str = "HEALTHGRAPH_STORE";
pub const ENV_DB_PATH: &str = "HEALTHGRAPH_DB_PATH";
pub const ENV_NAMESPACE: &str = "HEALTHGRAPH_NAMESPACE";
pub const ENV_DATABASE: &str = "HEALTHGRAPH_DATABASE";
pub const ENV_LOG: &str = "HEALTHGRAPH_LOG";
