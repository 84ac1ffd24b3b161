//! Tool definitions and schema generation for the MCP protocol.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::Tool;
use rmcp::ErrorData as McpError;

use crate::args::{
    ArbitraryStateTransitionArgs, CheckConsistencyArgs, GenesisArgs, GetCurrentStateInfoArgs,
    GetCurrentStateNumberArgs, GetStateInfoArgs, GetStateTransitionsArgs, GetTransitionInfoArgs,
    NewStateTransitionArgs, RepairConsistencyArgs, SearchStatesArgs, TotalStatesArgs,
    TrackTransitionsArgs,
};

/// Tool definitions for the MCP protocol.
pub struct ToolDefinitions;

impl ToolDefinitions {
    /// `genesis`.
    pub fn genesis() -> Result<Tool, McpError> {
        Self::create_tool(
            "genesis",
            "Initialize the state machine: fingerprint the project and create snapshot 0",
            schemars::schema_for!(GenesisArgs),
        )
    }

    /// `new_state_transition`.
    pub fn new_state_transition() -> Result<Tool, McpError> {
        Self::create_tool(
            "new_state_transition",
            "Record a sequential transition: snapshot the current project state and advance",
            schemars::schema_for!(NewStateTransitionArgs),
        )
    }

    /// `arbitrary_state_transition`.
    pub fn arbitrary_state_transition() -> Result<Tool, McpError> {
        Self::create_tool(
            "arbitrary_state_transition",
            "Move the current-state pointer to an existing state without snapshotting",
            schemars::schema_for!(ArbitraryStateTransitionArgs),
        )
    }

    /// `get_current_state_number`.
    pub fn get_current_state_number() -> Result<Tool, McpError> {
        Self::create_tool(
            "get_current_state_number",
            "Get the current-state pointer's state number",
            schemars::schema_for!(GetCurrentStateNumberArgs),
        )
    }

    /// `get_current_state_info`.
    pub fn get_current_state_info() -> Result<Tool, McpError> {
        Self::create_tool(
            "get_current_state_info",
            "Get the full record for the current state",
            schemars::schema_for!(GetCurrentStateInfoArgs),
        )
    }

    /// `get_state_info`.
    pub fn get_state_info() -> Result<Tool, McpError> {
        Self::create_tool(
            "get_state_info",
            "Get the full record for a specific state number",
            schemars::schema_for!(GetStateInfoArgs),
        )
    }

    /// `total_states`.
    pub fn total_states() -> Result<Tool, McpError> {
        Self::create_tool(
            "total_states",
            "Count the number of recorded states",
            schemars::schema_for!(TotalStatesArgs),
        )
    }

    /// `search_states`.
    pub fn search_states() -> Result<Tool, McpError> {
        Self::create_tool(
            "search_states",
            "Search recorded states by a substring of their prompt",
            schemars::schema_for!(SearchStatesArgs),
        )
    }

    /// `get_state_transitions`.
    pub fn get_state_transitions() -> Result<Tool, McpError> {
        Self::create_tool(
            "get_state_transitions",
            "List the transition IDs incident to a state",
            schemars::schema_for!(GetStateTransitionsArgs),
        )
    }

    /// `get_transition_info`.
    pub fn get_transition_info() -> Result<Tool, McpError> {
        Self::create_tool(
            "get_transition_info",
            "Get the full record for a single transition",
            schemars::schema_for!(GetTransitionInfoArgs),
        )
    }

    /// `track_transitions`.
    pub fn track_transitions() -> Result<Tool, McpError> {
        Self::create_tool(
            "track_transitions",
            "List the five most recently recorded transition IDs",
            schemars::schema_for!(TrackTransitionsArgs),
        )
    }

    /// `check_consistency`.
    pub fn check_consistency() -> Result<Tool, McpError> {
        Self::create_tool(
            "check_consistency",
            "Run the consistency diagnostic over storage and the volume layout",
            schemars::schema_for!(CheckConsistencyArgs),
        )
    }

    /// `repair_consistency`.
    pub fn repair_consistency() -> Result<Tool, McpError> {
        Self::create_tool(
            "repair_consistency",
            "Run the consistency diagnostic and auto-repair the safe subset of issues",
            schemars::schema_for!(RepairConsistencyArgs),
        )
    }

    fn create_tool(
        name: &'static str,
        description: &'static str,
        schema: schemars::Schema,
    ) -> Result<Tool, McpError> {
        let schema_value = serde_json::to_value(schema)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let input_schema = schema_value
            .as_object()
            .ok_or_else(|| {
                McpError::internal_error(format!("schema for {name} is not an object"), None)
            })?
            .clone();

        Ok(Tool {
            name: Cow::Borrowed(name),
            title: None,
            description: Some(Cow::Borrowed(description)),
            input_schema: Arc::new(input_schema),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: Default::default(),
        })
    }
}

/// Builds the full tool list for the MCP `list_tools` response.
pub fn create_tool_list() -> Result<Vec<Tool>, McpError> {
    Ok(vec![
        ToolDefinitions::genesis()?,
        ToolDefinitions::new_state_transition()?,
        ToolDefinitions::arbitrary_state_transition()?,
        ToolDefinitions::get_current_state_number()?,
        ToolDefinitions::get_current_state_info()?,
        ToolDefinitions::get_state_info()?,
        ToolDefinitions::total_states()?,
        ToolDefinitions::search_states()?,
        ToolDefinitions::get_state_transitions()?,
        ToolDefinitions::get_transition_info()?,
        ToolDefinitions::track_transitions()?,
        ToolDefinitions::check_consistency()?,
        ToolDefinitions::repair_consistency()?,
    ])
}
