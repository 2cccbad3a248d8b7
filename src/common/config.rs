//! Configuration loading for the slots engine
//!
//! Reads a TOML file (or defaults), applies `SLOTS_*` environment overrides
//! and validates the result.

use crate::config::{AuthorityMode, LogLevel, SlotsConfig};
use crate::errors::{ConfigurationError, SlotsResult};
use std::env;
use std::path::Path;
use std::str::FromStr;

pub const ENV_ANIMATION_INTERVAL_MS: &str = "SLOTS_ANIMATION_INTERVAL_MS";
pub const ENV_MIN_SPIN_DURATION_MS: &str = "SLOTS_MIN_SPIN_DURATION_MS";
pub const ENV_ERROR_DISPLAY_MS: &str = "SLOTS_ERROR_DISPLAY_MS";
pub const ENV_AUTHORITY_MODE: &str = "SLOTS_AUTHORITY_MODE";
pub const ENV_AUTHORITY_TIMEOUT_MS: &str = "SLOTS_AUTHORITY_TIMEOUT_MS";
pub const ENV_RNG_SEED: &str = "SLOTS_RNG_SEED";
pub const ENV_LOG_LEVEL: &str = "SLOTS_LOG_LEVEL";

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> SlotsResult<SlotsConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(&self, lookup: F) -> SlotsResult<SlotsConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => SlotsConfig::default(),
        };

        apply_overrides_from(&mut config, lookup)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> SlotsResult<SlotsConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn validate(&self, config: &SlotsConfig) -> SlotsResult<()> {
        config
            .validate()
            .map_err(|e| ConfigurationError::ValidationFailed(e.to_string()).into())
    }

    /// Save configuration to file
    pub fn save(&self, config: &SlotsConfig, path: &str) -> SlotsResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_var<T: FromStr>(key: &str, value: String, reason: &str) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        field: key.to_string(),
        value,
        reason: reason.to_string(),
    })
}

/// Apply `SLOTS_*` overrides read through `lookup`
pub fn apply_overrides_from<F>(config: &mut SlotsConfig, lookup: F) -> SlotsResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_ANIMATION_INTERVAL_MS) {
        config.timing.animation_interval_ms = parse_var(ENV_ANIMATION_INTERVAL_MS, v, "Invalid interval")?;
    }
    if let Some(v) = lookup(ENV_MIN_SPIN_DURATION_MS) {
        config.timing.min_spin_duration_ms = parse_var(ENV_MIN_SPIN_DURATION_MS, v, "Invalid duration")?;
    }
    if let Some(v) = lookup(ENV_ERROR_DISPLAY_MS) {
        config.timing.error_display_ms = parse_var(ENV_ERROR_DISPLAY_MS, v, "Invalid duration")?;
    }
    if let Some(v) = lookup(ENV_AUTHORITY_MODE) {
        config.authority.mode = parse_var::<AuthorityMode>(ENV_AUTHORITY_MODE, v, "Expected 'local_fallback' or 'program'")?;
    }
    if let Some(v) = lookup(ENV_AUTHORITY_TIMEOUT_MS) {
        config.authority.response_timeout_ms = Some(parse_var(ENV_AUTHORITY_TIMEOUT_MS, v, "Invalid timeout value")?);
    }
    if let Some(v) = lookup(ENV_RNG_SEED) {
        config.sampling.seed = Some(parse_var(ENV_RNG_SEED, v, "Invalid seed")?);
    }
    if let Some(v) = lookup(ENV_LOG_LEVEL) {
        config.monitoring.log_level = parse_var::<LogLevel>(ENV_LOG_LEVEL, v, "Invalid log level")?;
    }

    Ok(())
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> SlotsResult<()> {
    ConfigLoader::new().save(&SlotsConfig::default(), path)
}
