//! Tool argument types for the MCP server.
//!
//! Every tool takes a `client_id` used for rate limiting; schema generation
//! Each type pairs `schemars::JsonSchema` for the tool schema with
//! `validator::Validate` for surface-level sanitization ahead of the
//! domain layer's own checks.

use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

fn validate_client_id(id: &str) -> Result<(), validator::ValidationError> {
    if id.trim().is_empty() {
        return Err(validator::ValidationError::new("client_id cannot be empty"));
    }
    Ok(())
}

/// Arguments for `genesis`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for initializing the state machine")]
pub struct GenesisArgs {
    /// Path to the project directory to fingerprint.
    #[validate(length(min = 1, max = 4096, message = "projectPath must be 1..4096 characters"))]
    #[schemars(description = "Absolute or relative path to the project to snapshot")]
    #[serde(rename = "projectPath")]
    pub project_path: String,
    /// Root of the working-copy volume the state machine manages.
    #[validate(length(min = 1, max = 4096, message = "volumePath must be 1..4096 characters"))]
    #[schemars(description = "Root directory for the managed working-copy volume")]
    #[serde(rename = "volumePath")]
    pub volume_path: String,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `new_state_transition`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for recording a sequential state transition")]
pub struct NewStateTransitionArgs {
    /// Description of the change being recorded.
    #[validate(length(min = 1, message = "userPrompt must not be empty"))]
    #[schemars(description = "Human-readable description of the change being snapshotted")]
    #[serde(rename = "userPrompt")]
    pub user_prompt: String,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `arbitrary_state_transition`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for jumping the current-state pointer to an existing state")]
pub struct ArbitraryStateTransitionArgs {
    /// The state number to move the current-state pointer to.
    #[schemars(description = "Target state number; must already exist and differ from current")]
    #[serde(rename = "nextState")]
    pub next_state: u64,
    /// Optional description for the new edge.
    #[schemars(description = "Optional description recorded on the new transition edge")]
    #[serde(rename = "userPrompt")]
    pub user_prompt: Option<String>,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `get_current_state_number`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for reading the current-state pointer")]
pub struct GetCurrentStateNumberArgs {
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `get_current_state_info`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for reading the current state's full record")]
pub struct GetCurrentStateInfoArgs {
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `get_state_info`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for reading a specific state's record")]
pub struct GetStateInfoArgs {
    /// State number to look up.
    #[schemars(description = "State number to look up")]
    pub state: u64,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `total_states`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for counting recorded states")]
pub struct TotalStatesArgs {
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `search_states`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for searching states by prompt substring")]
pub struct SearchStatesArgs {
    /// Substring matched against each state's recorded prompt.
    #[validate(length(min = 1, message = "text must not be empty"))]
    #[schemars(description = "Substring to match against recorded prompts")]
    pub text: String,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `get_state_transitions`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for listing the transitions touching a state")]
pub struct GetStateTransitionsArgs {
    /// State number whose incident edges are listed.
    #[schemars(description = "State number whose incident transitions are listed")]
    pub state: u64,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `get_transition_info`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for reading a single transition's record")]
pub struct GetTransitionInfoArgs {
    /// Transition ID, as a decimal string.
    #[validate(length(min = 1, message = "transitionId must not be empty"))]
    #[schemars(description = "Transition ID as a decimal string")]
    #[serde(rename = "transitionId")]
    pub transition_id: String,
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `track_transitions`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for listing the five most recent transitions")]
pub struct TrackTransitionsArgs {
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `check_consistency`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for running the consistency diagnostic")]
pub struct CheckConsistencyArgs {
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Arguments for `repair_consistency`.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[schemars(description = "Parameters for auto-repairing the safe subset of consistency issues")]
pub struct RepairConsistencyArgs {
    /// Caller identity, used for rate limiting.
    #[validate(custom(function = "validate_client_id"))]
    #[schemars(description = "Caller identifier used for rate limiting")]
    #[serde(rename = "clientId")]
    pub client_id: String,
}
