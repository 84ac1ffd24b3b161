//! `tracing`-backed audit logger.

use csm_domain::ports::audit::{AuditEvent, AuditLogger, AuditOutcome};
use tracing::{error, info, warn};

/// Emits every [`AuditEvent`] as a structured `tracing` event at
/// `audit.state_transition`-style targets, so audit records flow through
/// whatever subscriber [`crate::logging::init_logging`] installed.
#[derive(Debug, Default)]
pub struct TracingAuditLogger;

impl TracingAuditLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: AuditEvent) {
        match event.outcome {
            AuditOutcome::Success => info!(
                target: "audit",
                operation = %event.operation,
                event_type = ?event.event_type,
                client_id = event.client_id.as_deref(),
                state_number = event.state_number,
                duration_ms = event.duration_ms,
                "audit event"
            ),
            AuditOutcome::Denied => warn!(
                target: "audit",
                operation = %event.operation,
                event_type = ?event.event_type,
                client_id = event.client_id.as_deref(),
                state_number = event.state_number,
                error = event.error_message.as_deref(),
                "audit event denied"
            ),
            AuditOutcome::Failure => error!(
                target: "audit",
                operation = %event.operation,
                event_type = ?event.event_type,
                client_id = event.client_id.as_deref(),
                state_number = event.state_number,
                error = event.error_message.as_deref(),
                "audit event failed"
            ),
        }
    }
}

/// Discards every event. Used when `logging.audit_enabled = false`.
#[derive(Debug, Default)]
pub struct NullAuditLogger;

impl AuditLogger for NullAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use csm_domain::ports::audit::AuditEventType;

    #[test]
    fn logging_an_event_does_not_panic() {
        let logger = TracingAuditLogger::new();
        logger.log(AuditEvent::success("genesis", AuditEventType::Genesis).with_state_number(0));
        logger.log(
            AuditEvent::success("new_state_transition", AuditEventType::StateTransition)
                .failed("storage unreachable"),
        );
    }
}
