//! Shapes tool outcomes into `{success, message, …}` records, serialized as
//! JSON text content. The result shapes here are typed records rather than
//! markdown-for-humans formatting: this surface's callers are programmatic
//! MCP clients, not a search UI.

use csm_domain::error::Error;
use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use serde::Serialize;
use serde_json::{json, Value};

/// Serializes `payload` merged with `{"success": true}` into a tool result.
pub fn ok<T: Serialize>(payload: T) -> Result<CallToolResult, McpError> {
    let mut value = serde_json::to_value(payload)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    if let Value::Object(map) = &mut value {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Ok(CallToolResult::success(vec![Content::text(
        value.to_string(),
    )]))
}

/// Renders a domain [`Error`] as `{success: false, message, error}`, never
/// propagated as an MCP protocol error: the propagation policy
/// keeps failures inside the tool result so callers can branch on
/// `success` instead of catching transport-level errors.
pub fn failure(err: Error) -> Result<CallToolResult, McpError> {
    let body = json!({
        "success": false,
        "message": err.to_string(),
        "error": err.category(),
    });
    Ok(CallToolResult::success(vec![Content::text(
        body.to_string(),
    )]))
}

/// Parses `request.arguments` into `T`, rejecting malformed input at the
/// protocol layer (this one case does propagate as an MCP error: the
/// request never reached a tool to produce a `{success, message}` record).
pub fn parse_args<T: serde::de::DeserializeOwned>(
    request: &rmcp::model::CallToolRequestParam,
) -> Result<T, McpError> {
    let value = Value::Object(request.arguments.clone().unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("invalid arguments: {e}"), None))
}
