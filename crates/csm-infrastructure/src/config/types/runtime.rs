//! Volume, VCS and logging knobs.

use serde::{Deserialize, Serialize};

/// Working-copy volume and VCS adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Root of the managed working-copy volume.
    pub volume_path: String,
    /// Per-call timeout for shelling out to the VCS tool, in seconds.
    pub git_timeout_secs: u64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            volume_path: "./csm-volume".to_string(),
            git_timeout_secs: csm_domain::constants::DEFAULT_GIT_TIMEOUT_SECS,
        }
    }
}

/// Structured-logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace`/`debug`/`info`/`warn`/`error`, or an `EnvFilter` directive string.
    pub log_level: String,
    /// Emit newline-delimited JSON instead of the human-readable format.
    pub json: bool,
    /// Whether audit events are recorded.
    pub audit_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            audit_enabled: true,
        }
    }
}
