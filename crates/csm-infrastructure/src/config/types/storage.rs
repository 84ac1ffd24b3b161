//! Storage-backend selection and connection settings.

use serde::{Deserialize, Serialize};

/// Which storage backend the service is configured to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbMode {
    /// SQLite via `rusqlite`/`r2d2`.
    Relational,
    /// Neo4j via `neo4rs`.
    Graph,
}

impl Default for DbMode {
    fn default() -> Self {
        Self::Relational
    }
}

/// Neo4j connection settings, used only when `db_mode = graph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Bolt URI, e.g. `bolt://localhost:7687`.
    pub uri: String,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Connection timeout, in seconds.
    pub connection_timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            connection_timeout_secs: 10,
        }
    }
}

/// Relational- and graph-backend settings, grouped under the `storage` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Active backend. Falls back to relational on graph-init failure.
    pub db_mode: DbMode,
    /// Neo4j connection settings.
    pub graph: GraphConfig,
    /// Path to the SQLite database file.
    pub sqlite_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_mode: DbMode::default(),
            graph: GraphConfig::default(),
            sqlite_path: "csm.sqlite3".to_string(),
        }
    }
}
