//! Storage backend implementations.

pub mod graph;
pub mod sqlite;

pub use graph::{connect as connect_graph, GraphStateRepository, GraphTransitionRepository};
pub use sqlite::{open_pool, SqliteStateRepository, SqliteTransitionRepository};
