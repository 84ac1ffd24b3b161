//! Core MCP protocol server.
//!
//! Implements the `rmcp` `ServerHandler` trait over the tool registry.

use std::sync::Arc;

use csm_infrastructure::AppServices;
use rmcp::model::{
    CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
    ServerCapabilities, ServerInfo,
};
use rmcp::ErrorData as McpError;
use rmcp::ServerHandler;

use crate::handlers::{IntegrityHandlers, ReadHandlers, WriteHandlers};
use crate::tools::{create_tool_list, route_tool_call, ToolHandlers};

/// The codebase state machine's MCP server. Depends only on the
/// already-wired [`AppServices`] and receives everything through
/// constructor injection.
#[derive(Clone)]
pub struct McpServer {
    writers: Arc<WriteHandlers>,
    readers: Arc<ReadHandlers>,
    integrity: Arc<IntegrityHandlers>,
}

impl McpServer {
    /// Builds the server over a fully-wired [`AppServices`].
    pub fn new(services: Arc<AppServices>) -> Self {
        Self {
            writers: Arc::new(WriteHandlers::new(Arc::clone(&services))),
            readers: Arc::new(ReadHandlers::new(Arc::clone(&services))),
            integrity: Arc::new(IntegrityHandlers::new(services)),
        }
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "Codebase State Machine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Codebase State Machine - immutable numbered snapshots connected by \
                 transitions\n\n\
                 Tools:\n\
                 - genesis: initialize the state machine for a project/volume pair\n\
                 - new_state_transition: snapshot the project and advance sequentially\n\
                 - arbitrary_state_transition: jump the current-state pointer\n\
                 - get_current_state_number / get_current_state_info\n\
                 - get_state_info / total_states / search_states\n\
                 - get_state_transitions / get_transition_info / track_transitions\n\
                 - check_consistency / repair_consistency\n"
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _pagination: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = create_tool_list()?;
        Ok(ListToolsResult {
            tools,
            meta: Default::default(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let handlers = ToolHandlers {
            writers: Arc::clone(&self.writers),
            readers: Arc::clone(&self.readers),
            integrity: Arc::clone(&self.integrity),
        };
        route_tool_call(request, &handlers).await
    }
}
