//! Handlers for the three write operations: `genesis`,
//! `new_state_transition`, `arbitrary_state_transition`.

use std::path::PathBuf;
use std::sync::Arc;

use csm_infrastructure::AppServices;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde_json::json;
use validator::Validate;

use crate::args::{ArbitraryStateTransitionArgs, GenesisArgs, NewStateTransitionArgs};
use crate::guard;
use crate::response;

/// Handles the write operations that mutate the state machine.
pub struct WriteHandlers {
    services: Arc<AppServices>,
}

impl WriteHandlers {
    /// Builds handlers over the given wired services.
    pub fn new(services: Arc<AppServices>) -> Self {
        Self { services }
    }

    /// `genesis`.
    pub async fn genesis(
        &self,
        Parameters(args): Parameters<GenesisArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = guard::check(
            self.services.rate_limiter.as_ref(),
            self.services.audit.as_ref(),
            &args.client_id,
            "genesis",
        )
        .await
        {
            return response::failure(e);
        }

        match self
            .services
            .state_service
            .genesis(PathBuf::from(args.project_path), PathBuf::from(args.volume_path))
            .await
        {
            Ok(state) => response::ok(json!({
                "state": state,
                "message": format!("state machine initialized at state {}", state.state_number),
            })),
            Err(e) => response::failure(e),
        }
    }

    /// `new_state_transition`.
    pub async fn new_state_transition(
        &self,
        Parameters(args): Parameters<NewStateTransitionArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = guard::check(
            self.services.rate_limiter.as_ref(),
            self.services.audit.as_ref(),
            &args.client_id,
            "new_state_transition",
        )
        .await
        {
            return response::failure(e);
        }

        match self
            .services
            .state_service
            .new_state_transition(args.user_prompt)
            .await
        {
            Ok(state) => response::ok(json!({
                "state": state,
                "message": format!("transition recorded: state {}", state.state_number),
            })),
            Err(e) => response::failure(e),
        }
    }

    /// `arbitrary_state_transition`.
    pub async fn arbitrary_state_transition(
        &self,
        Parameters(args): Parameters<ArbitraryStateTransitionArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = guard::check(
            self.services.rate_limiter.as_ref(),
            self.services.audit.as_ref(),
            &args.client_id,
            "arbitrary_state_transition",
        )
        .await
        {
            return response::failure(e);
        }

        let target = args.next_state;
        let transition = match self
            .services
            .state_service
            .arbitrary_state_transition(target, args.user_prompt)
            .await
        {
            Ok(t) => t,
            Err(e) => return response::failure(e),
        };

        match self.services.state_service.get_state_info(transition.next_state).await {
            Ok(state) => response::ok(json!({
                "state": state,
                "message": format!("jumped to state {target}"),
            })),
            Err(e) => response::failure(e),
        }
    }
}
