//! Layered configuration loading: defaults, then an optional TOML file,
//! then `CSM_`-prefixed environment variables.

use std::env;
use std::path::{Path, PathBuf};

use csm_domain::error::{Error, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::constants::{CONFIG_ENV_PREFIX, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use crate::logging::log_config_loaded;

use super::types::AppConfig;

/// Builds an [`AppConfig`] by merging configuration sources.
#[derive(Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// A loader with default source resolution.
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Pins the configuration file path rather than searching for one.
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the environment-variable prefix.
    #[must_use]
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration, merging in order: defaults, TOML file (if
    /// found), `{PREFIX}_`-prefixed environment variables.
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(config_path) = &self.config_path {
            if config_path.exists() {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(config_path, true);
            } else {
                log_config_loaded(config_path, false);
            }
        } else if let Some(default_path) = Self::find_default_config_path() {
            figment = figment.merge(Toml::file(&default_path));
            log_config_loaded(&default_path, true);
        }

        figment = figment.merge(Env::prefixed(&format!("{}_", self.env_prefix)).split("_"));

        let config: AppConfig = figment
            .extract()
            .map_err(|e| Error::configuration_with_source("failed to extract configuration", e))?;

        validate_app_config(&config)?;
        Ok(config)
    }

    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;
        let candidates = [
            current_dir.join(DEFAULT_CONFIG_FILENAME),
            current_dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME),
            dirs::config_dir()
                .map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|d| d.join(format!(".{DEFAULT_CONFIG_DIR}")).join(DEFAULT_CONFIG_FILENAME))
                .unwrap_or_default(),
        ];
        candidates.into_iter().find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_app_config(config: &AppConfig) -> Result<()> {
    if config.limits.max_prompt_length == 0 {
        return Err(Error::configuration("max_prompt_length cannot be 0"));
    }
    if config.limits.max_state_number == 0 {
        return Err(Error::configuration("max_state_number cannot be 0"));
    }
    if config.limits.rate_limit_enabled && config.limits.rate_limit_max_calls == 0 {
        return Err(Error::configuration(
            "rate_limit_max_calls cannot be 0 when rate limiting is enabled",
        ));
    }
    if config.volume.git_timeout_secs == 0 {
        return Err(Error::configuration("git_timeout_secs cannot be 0"));
    }
    if config.volume.volume_path.trim().is_empty() {
        return Err(Error::configuration("volume_path cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = AppConfig::default();
        assert!(validate_app_config(&config).is_ok());
    }

    #[test]
    fn rejects_zero_prompt_length() {
        let mut config = AppConfig::default();
        config.limits.max_prompt_length = 0;
        assert!(validate_app_config(&config).is_err());
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csm.toml");
        std::fs::write(&path, "[volume]\nvolume_path = \"/tmp/custom\"\ngit_timeout_secs = 30\n")
            .unwrap();
        let config = ConfigLoader::new().with_config_path(&path).load().unwrap();
        assert_eq!(config.volume.volume_path, "/tmp/custom");
        assert_eq!(config.volume.git_timeout_secs, 30);
    }
}
