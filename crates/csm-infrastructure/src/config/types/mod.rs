//! Strongly-typed configuration sections, merged by [`crate::config::ConfigLoader`].

mod limits;
mod runtime;
mod storage;

pub use limits::LimitsConfig;
pub use runtime::{LoggingConfig, VolumeConfig};
pub use storage::{DbMode, GraphConfig, StorageConfig};

use serde::{Deserialize, Serialize};

/// Top-level application configuration, assembled from defaults, an
/// optional TOML file, and `CSM_`-prefixed environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage backend selection and connection settings.
    pub storage: StorageConfig,
    /// Volume and VCS adapter settings.
    pub volume: VolumeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Validation and rate-limiting knobs.
    pub limits: LimitsConfig,
}
