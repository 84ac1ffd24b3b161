//! MCP tool definitions and dispatch.
//!
//! - `registry` — tool schemas for `list_tools`.
//! - `router` — dispatch for `call_tool`.

pub mod registry;
pub mod router;

pub use registry::create_tool_list;
pub use router::{route_tool_call, ToolHandlers};
