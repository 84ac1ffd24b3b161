//! Dispatches incoming `call_tool` requests to the right handler.

use std::sync::Arc;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::ErrorData as McpError;

use crate::handlers::{IntegrityHandlers, ReadHandlers, WriteHandlers};
use crate::response::parse_args;

/// Handler references used to route a tool call.
pub struct ToolHandlers {
    /// Write-path handlers.
    pub writers: Arc<WriteHandlers>,
    /// Read-path handlers.
    pub readers: Arc<ReadHandlers>,
    /// Integrity-subsystem handlers.
    pub integrity: Arc<IntegrityHandlers>,
}

/// Routes `request` to its handler by tool name.
pub async fn route_tool_call(
    request: CallToolRequestParam,
    handlers: &ToolHandlers,
) -> Result<CallToolResult, McpError> {
    match request.name.as_ref() {
        "genesis" => handlers.writers.genesis(Parameters(parse_args(&request)?)).await,
        "new_state_transition" => {
            handlers
                .writers
                .new_state_transition(Parameters(parse_args(&request)?))
                .await
        }
        "arbitrary_state_transition" => {
            handlers
                .writers
                .arbitrary_state_transition(Parameters(parse_args(&request)?))
                .await
        }
        "get_current_state_number" => {
            handlers
                .readers
                .get_current_state_number(Parameters(parse_args(&request)?))
                .await
        }
        "get_current_state_info" => {
            handlers
                .readers
                .get_current_state_info(Parameters(parse_args(&request)?))
                .await
        }
        "get_state_info" => {
            handlers
                .readers
                .get_state_info(Parameters(parse_args(&request)?))
                .await
        }
        "total_states" => {
            handlers
                .readers
                .total_states(Parameters(parse_args(&request)?))
                .await
        }
        "search_states" => {
            handlers
                .readers
                .search_states(Parameters(parse_args(&request)?))
                .await
        }
        "get_state_transitions" => {
            handlers
                .readers
                .get_state_transitions(Parameters(parse_args(&request)?))
                .await
        }
        "get_transition_info" => {
            handlers
                .readers
                .get_transition_info(Parameters(parse_args(&request)?))
                .await
        }
        "track_transitions" => {
            handlers
                .readers
                .track_transitions(Parameters(parse_args(&request)?))
                .await
        }
        "check_consistency" => {
            handlers
                .integrity
                .check_consistency(Parameters(parse_args(&request)?))
                .await
        }
        "repair_consistency" => {
            handlers
                .integrity
                .repair_consistency(Parameters(parse_args(&request)?))
                .await
        }
        other => Err(McpError::invalid_params(format!("unknown tool: {other}"), None)),
    }
}
