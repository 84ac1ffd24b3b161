//! Rate-limit gate applied by every handler ahead of its use case call
//!.

use csm_domain::error::Error;
use csm_domain::ports::audit::{AuditEvent, AuditEventType, AuditLogger};
use csm_domain::ports::rate_limit::RateLimiter;

/// Checks `client_id`'s rate limit for `endpoint`, auditing a denial before
/// returning it.
pub async fn check(
    rate_limiter: &dyn RateLimiter,
    audit: &dyn AuditLogger,
    client_id: &str,
    endpoint: &str,
) -> Result<(), Error> {
    if let Err(e) = rate_limiter.check(client_id, endpoint).await {
        audit.log(
            AuditEvent::success(endpoint, AuditEventType::RateLimitExceeded)
                .with_client_id(client_id)
                .denied(e.to_string()),
        );
        return Err(e);
    }
    Ok(())
}
