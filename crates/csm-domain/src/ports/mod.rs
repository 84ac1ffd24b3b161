//! Outbound ports the application layer depends on but does not implement.

mod audit;
mod rate_limit;
mod vcs;

pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditOutcome};
pub use rate_limit::RateLimiter;
pub use vcs::{IgnorePredicate, VcsAdapter};
