//! Audit-logging port: a structured audit trail for every state-mutating
//! and state-reading call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of an auditable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A sequential transition (`new_state_transition`).
    StateTransition,
    /// A jump (`arbitrary_state_transition`).
    ArbitraryTransition,
    /// Genesis.
    Genesis,
    /// A read of existing state.
    StateAccess,
    /// A search over state prompts.
    Search,
    /// Rejected at input validation.
    ValidationFailure,
    /// Rejected by the rate limiter.
    RateLimitExceeded,
    /// Any other unexpected failure.
    Error,
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Completed successfully.
    Success,
    /// Failed.
    Failure,
    /// Rejected before core work ran.
    Denied,
}

/// One structured audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the calling client, if known.
    pub client_id: Option<String>,
    /// The tool-surface operation name.
    pub operation: String,
    /// The event category.
    pub event_type: AuditEventType,
    /// The result.
    pub outcome: AuditOutcome,
    /// Snapshot involved, if any.
    pub state_number: Option<u64>,
    /// Extra free-form context (never raw prompts beyond what's already logged elsewhere).
    pub details: Option<String>,
    /// Error message, present only on failure/denial.
    pub error_message: Option<String>,
    /// Wall-clock duration of the operation, in milliseconds.
    pub duration_ms: Option<u64>,
}

impl AuditEvent {
    /// Builds a minimal, successful audit event for `operation`.
    pub fn success(operation: impl Into<String>, event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            client_id: None,
            operation: operation.into(),
            event_type,
            outcome: AuditOutcome::Success,
            state_number: None,
            details: None,
            error_message: None,
            duration_ms: None,
        }
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the involved snapshot number.
    #[must_use]
    pub fn with_state_number(mut self, state_number: u64) -> Self {
        self.state_number = Some(state_number);
        self
    }

    /// Marks the event as a failure with `message`.
    #[must_use]
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Failure;
        self.error_message = Some(message.into());
        self
    }

    /// Marks the event as denied (e.g. rate-limited) with `message`.
    #[must_use]
    pub fn denied(mut self, message: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Denied;
        self.error_message = Some(message.into());
        self
    }

    /// Records the operation's wall-clock duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Sink for [`AuditEvent`]s.
///
/// Passed explicitly to each use case as a collaborator rather
/// than a module-level global.
pub trait AuditLogger: Send + Sync {
    /// Records one audit event.
    fn log(&self, event: AuditEvent);
}
