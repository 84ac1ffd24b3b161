//! Rate-limiting middleware port.

use async_trait::async_trait;

use crate::error::Result;

/// Sliding-window rate limiter keyed by `(client_id, endpoint)`.
///
/// Treated as an external collaborator: only the black-box
/// behavior is specified here. [`RateLimiter::check`] returns
/// [`crate::error::Error::RateLimitExceeded`] when the caller should be
/// rejected before any core work runs.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records one call from `client_id` against `endpoint` and rejects it
    /// if that pushes the caller over its window limit.
    async fn check(&self, client_id: &str, endpoint: &str) -> Result<()>;
}
