//! Handlers for `check_consistency` and `repair_consistency`.

use std::sync::Arc;

use csm_application::use_cases::integrity::summarize;
use csm_infrastructure::AppServices;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use serde_json::json;
use validator::Validate;

use crate::args::{CheckConsistencyArgs, RepairConsistencyArgs};
use crate::guard;
use crate::response;

/// Handles the two integrity-subsystem tool-surface operations.
pub struct IntegrityHandlers {
    services: Arc<AppServices>,
}

impl IntegrityHandlers {
    /// Builds handlers over the given wired services.
    pub fn new(services: Arc<AppServices>) -> Self {
        Self { services }
    }

    /// `check_consistency`.
    pub async fn check_consistency(
        &self,
        Parameters(args): Parameters<CheckConsistencyArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = guard::check(
            self.services.rate_limiter.as_ref(),
            self.services.audit.as_ref(),
            &args.client_id,
            "check_consistency",
        )
        .await
        {
            return response::failure(e);
        }

        match self.services.state_service.check_consistency().await {
            Ok(issues) => {
                let summary = summarize(&issues);
                response::ok(json!({ "issues": issues, "summary": summary }))
            }
            Err(e) => response::failure(e),
        }
    }

    /// `repair_consistency`.
    pub async fn repair_consistency(
        &self,
        Parameters(args): Parameters<RepairConsistencyArgs>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = args.validate() {
            return Err(McpError::invalid_params(e.to_string(), None));
        }
        if let Err(e) = guard::check(
            self.services.rate_limiter.as_ref(),
            self.services.audit.as_ref(),
            &args.client_id,
            "repair_consistency",
        )
        .await
        {
            return response::failure(e);
        }

        match self.services.state_service.repair_consistency().await {
            Ok(report) => {
                let summary = summarize(&report.remaining_issues);
                response::ok(json!({
                    "repaired": report.repaired,
                    "failed": report.failed,
                    "remaining_issues": report.remaining_issues,
                    "summary": summary,
                }))
            }
            Err(e) => response::failure(e),
        }
    }
}
