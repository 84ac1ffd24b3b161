//! Handlers for the eight read-only operations: these never
//! touch the write lock and return lightweight projections (numbers/ids)
//! where the tool table specifies them rather than full records.

use std::sync::Arc;

use csm_domain::error::Error;
use csm_infrastructure::AppServices;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde_json::json;
use validator::Validate;

use crate::args::{
    GetCurrentStateInfoArgs, GetCurrentStateNumberArgs, GetStateInfoArgs, GetStateTransitionsArgs,
    GetTransitionInfoArgs, SearchStatesArgs, TotalStatesArgs, TrackTransitionsArgs,
};
use crate::guard;
use crate::response;

/// Handles the eight read-only tool-surface operations.
pub struct ReadHandlers {
    services: Arc<AppServices>,
}

impl ReadHandlers {
    /// Builds handlers over the given wired services.
    pub fn new(services: Arc<AppServices>) -> Self {
        Self { services }
    }

    async fn gate(&self, client_id: &str, endpoint: &str) -> Result<(), Error> {
        guard::check(
            self.services.rate_limiter.as_ref(),
            self.services.audit.as_ref(),
            client_id,
            endpoint,
        )
        .await
    }

    /// `get_current_state_number`.
    pub async fn get_current_state_number(
        &self,
        Parameters(args): Parameters<GetCurrentStateNumberArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "get_current_state_number").await {
            return response::failure(e);
        }
        match self.services.state_service.get_current_state().await {
            Ok(state) => response::ok(json!({
                "state_number": state.map(|s| s.state_number),
            })),
            Err(e) => response::failure(e),
        }
    }

    /// `get_current_state_info`.
    pub async fn get_current_state_info(
        &self,
        Parameters(args): Parameters<GetCurrentStateInfoArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "get_current_state_info").await {
            return response::failure(e);
        }
        match self.services.state_service.get_current_state().await {
            Ok(state) => response::ok(json!({ "state": state })),
            Err(e) => response::failure(e),
        }
    }

    /// `get_state_info`.
    pub async fn get_state_info(
        &self,
        Parameters(args): Parameters<GetStateInfoArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "get_state_info").await {
            return response::failure(e);
        }
        match self.services.state_service.get_state_info(args.state).await {
            Ok(state) => response::ok(json!({ "state": state })),
            Err(e) => response::failure(e),
        }
    }

    /// `total_states`.
    pub async fn total_states(
        &self,
        Parameters(args): Parameters<TotalStatesArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "total_states").await {
            return response::failure(e);
        }
        match self.services.state_service.total_states().await {
            Ok(total) => response::ok(json!({ "total_states": total })),
            Err(e) => response::failure(e),
        }
    }

    /// `search_states`.
    pub async fn search_states(
        &self,
        Parameters(args): Parameters<SearchStatesArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "search_states").await {
            return response::failure(e);
        }
        match self.services.state_service.search_states(&args.text).await {
            Ok(states) => response::ok(json!({
                "states": states.iter().map(|s| s.state_number).collect::<Vec<_>>(),
            })),
            Err(e) => response::failure(e),
        }
    }

    /// `get_state_transitions`.
    pub async fn get_state_transitions(
        &self,
        Parameters(args): Parameters<GetStateTransitionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "get_state_transitions").await {
            return response::failure(e);
        }
        match self
            .services
            .state_service
            .get_state_transitions(args.state)
            .await
        {
            Ok(transitions) => response::ok(json!({
                "transitions": transitions.iter().map(|t| t.transition_id).collect::<Vec<_>>(),
            })),
            Err(e) => response::failure(e),
        }
    }

    /// `get_transition_info`.
    pub async fn get_transition_info(
        &self,
        Parameters(args): Parameters<GetTransitionInfoArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "get_transition_info").await {
            return response::failure(e);
        }
        let id: u64 = match args.transition_id.parse() {
            Ok(id) => id,
            Err(_) => {
                return response::failure(Error::invalid_argument(
                    "transitionId must be a non-negative integer",
                ))
            }
        };
        match self.services.state_service.get_transition_info(id).await {
            Ok(transition) => response::ok(json!({ "transition": transition })),
            Err(e) => response::failure(e),
        }
    }

    /// `track_transitions`.
    pub async fn track_transitions(
        &self,
        Parameters(args): Parameters<TrackTransitionsArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = self.gate(&args.client_id, "track_transitions").await {
            return response::failure(e);
        }
        match self.services.state_service.track_transitions().await {
            Ok(transitions) => response::ok(json!({
                "transitions": transitions.iter().map(|t| t.transition_id).collect::<Vec<_>>(),
            })),
            Err(e) => response::failure(e),
        }
    }
}
