//! Validation and rate-limiting knobs.

use serde::{Deserialize, Serialize};

/// Limits applied at the tool surface and by the rate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted prompt length.
    pub max_prompt_length: usize,
    /// Maximum accepted jump target / state number.
    pub max_state_number: u64,
    /// Whether the sliding-window rate limiter is active.
    pub rate_limit_enabled: bool,
    /// Calls allowed per window, per `(client_id, endpoint)`.
    pub rate_limit_max_calls: u32,
    /// Window length, in seconds.
    pub rate_limit_window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_length: csm_domain::constants::MAX_PROMPT_LENGTH,
            max_state_number: csm_domain::constants::MAX_STATE_NUMBER,
            rate_limit_enabled: true,
            rate_limit_max_calls: 60,
            rate_limit_window_secs: 60,
        }
    }
}
