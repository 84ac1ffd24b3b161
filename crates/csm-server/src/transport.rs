//! Stdio transport for the MCP server: reads JSON-RPC frames from stdin and
//! writes responses to stdout, leaving stderr free for logs.

use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing::info;

use crate::mcp_server::McpServer;

/// Serves `server` over stdio until the client disconnects.
pub async fn serve_stdio(server: McpServer) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting MCP protocol server on stdio transport");

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| format!("failed to start MCP service: {e:?}"))?;

    info!("MCP server ready, waiting for connections");
    service
        .waiting()
        .await
        .map_err(|e| format!("MCP service error: {e:?}"))?;

    info!("MCP server shutdown complete");
    Ok(())
}
