//! Server initialization: configuration, logging, dependency injection, and
//! stdio transport startup.

use std::path::Path;
use std::sync::Arc;

use csm_infrastructure::config::ConfigLoader;
use csm_infrastructure::{bootstrap, logging};
use tracing::info;

use crate::mcp_server::McpServer;
use crate::transport::serve_stdio;

/// Loads configuration, wires services, and serves the MCP protocol over
/// stdio until the client disconnects.
pub async fn run_server(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    logging::init_logging(&config.logging)?;

    info!(
        db_mode = ?config.storage.db_mode,
        volume_path = %config.volume.volume_path,
        "starting codebase state machine server"
    );

    let services = Arc::new(bootstrap(&config).await?);
    let server = McpServer::new(services);

    serve_stdio(server).await
}

fn load_config(
    config_path: Option<&Path>,
) -> Result<csm_infrastructure::AppConfig, Box<dyn std::error::Error>> {
    let loader = match config_path {
        Some(path) => ConfigLoader::new().with_config_path(path),
        None => ConfigLoader::new(),
    };
    Ok(loader.load()?)
}
