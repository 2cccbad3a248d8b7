//! Configuration management with validation and defaults
//!
//! Timing, betting and authority settings for the spin engine. Loaded from
//! TOML by `common::config::ConfigLoader`.

use crate::common::types::Lamports;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotsConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Spin timing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Interval between animation frames
    pub animation_interval_ms: u64,
    /// Lower bound on the time from spin start to result display
    pub min_spin_duration_ms: u64,
    /// How long an error message stays visible
    pub error_display_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            animation_interval_ms: 100,
            min_spin_duration_ms: 1500,
            error_display_ms: 5000,
        }
    }
}

/// Bet denominations offered to the player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BettingConfig {
    pub allowed_bets_sol: Vec<f64>,
    pub default_bet_sol: f64,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            allowed_bets_sol: vec![0.001, 0.01, 0.1, 0.5, 1.0],
            default_bet_sol: 0.01,
        }
    }
}

/// Where outcomes come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityMode {
    /// Client-side roll, no external authority
    LocalFallback,
    /// In-process slots program
    Program,
}

impl FromStr for AuthorityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "local_fallback" => Ok(AuthorityMode::LocalFallback),
            "program" => Ok(AuthorityMode::Program),
            other => Err(format!("unknown authority mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub mode: AuthorityMode,
    /// Upper bound on the authority call; unset waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
    /// Simulated confirmation latency of the in-process program
    pub program_latency_ms: u64,
    pub min_bet_sol: f64,
    pub max_bet_sol: f64,
    /// House edge recorded in the program state, in percent
    pub house_edge: u8,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            mode: AuthorityMode::LocalFallback,
            response_timeout_ms: None,
            program_latency_ms: 400,
            min_bet_sol: 0.001,
            max_bet_sol: 1.0,
            house_edge: 5,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Fixed seed for reproducible animation and local rolls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_logging: bool,
    pub log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            log_level: LogLevel::Info,
        }
    }
}

impl SlotsConfig {
    /// Program-backed play with realistic confirmation latency
    pub fn demo() -> Self {
        Self {
            authority: AuthorityConfig {
                mode: AuthorityMode::Program,
                program_latency_ms: 800,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Short animations for rapid play
    pub fn turbo() -> Self {
        Self {
            timing: TimingConfig {
                animation_interval_ms: 50,
                min_spin_duration_ms: 300,
                error_display_ms: 2000,
            },
            authority: AuthorityConfig {
                program_latency_ms: 100,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Deterministic local play for tests
    pub fn testing() -> Self {
        Self {
            sampling: SamplingConfig { seed: Some(42) },
            monitoring: MonitoringConfig {
                enable_logging: false,
                log_level: LogLevel::Warn,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.timing.animation_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "animation_interval_ms must be > 0".to_string(),
            ));
        }

        if self.timing.error_display_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "error_display_ms must be > 0".to_string(),
            ));
        }

        if self.timing.min_spin_duration_ms < self.timing.animation_interval_ms {
            return Err(ConfigValidationError::LogicalInconsistency(
                "min_spin_duration_ms must cover at least one animation frame".to_string(),
            ));
        }

        if self.authority.response_timeout_ms == Some(0) {
            return Err(ConfigValidationError::InvalidValue(
                "response_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        if self.betting.allowed_bets_sol.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "betting.allowed_bets_sol".to_string(),
            ));
        }

        if let Some(bad) = self
            .betting
            .allowed_bets_sol
            .iter()
            .find(|&&bet| Lamports::from_sol(bet).is_zero())
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "allowed bet {} is not a positive lamport amount",
                bad
            )));
        }

        if !self.allowed_bets().contains(&self.default_bet()) {
            return Err(ConfigValidationError::LogicalInconsistency(format!(
                "default bet {} is not one of the allowed bets",
                self.betting.default_bet_sol
            )));
        }

        let min_bet = Lamports::from_sol(self.authority.min_bet_sol);
        let max_bet = Lamports::from_sol(self.authority.max_bet_sol);
        if min_bet.is_zero() || min_bet > max_bet {
            return Err(ConfigValidationError::InvalidValue(
                "authority bet limits must satisfy 0 < min_bet_sol <= max_bet_sol".to_string(),
            ));
        }

        if self.authority.house_edge > 100 {
            return Err(ConfigValidationError::InvalidValue(
                "house_edge must be a percentage".to_string(),
            ));
        }

        if self.authority.mode == AuthorityMode::Program
            && self
                .allowed_bets()
                .iter()
                .any(|&bet| bet < min_bet || bet > max_bet)
        {
            return Err(ConfigValidationError::LogicalInconsistency(
                "allowed bets fall outside the program's bet limits".to_string(),
            ));
        }

        Ok(())
    }

    pub fn animation_interval(&self) -> Duration {
        Duration::from_millis(self.timing.animation_interval_ms)
    }

    pub fn min_spin_duration(&self) -> Duration {
        Duration::from_millis(self.timing.min_spin_duration_ms)
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.timing.error_display_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.authority.response_timeout_ms.map(Duration::from_millis)
    }

    pub fn program_latency(&self) -> Duration {
        Duration::from_millis(self.authority.program_latency_ms)
    }

    pub fn allowed_bets(&self) -> Vec<Lamports> {
        self.betting
            .allowed_bets_sol
            .iter()
            .map(|&sol| Lamports::from_sol(sol))
            .collect()
    }

    pub fn default_bet(&self) -> Lamports {
        Lamports::from_sol(self.betting.default_bet_sol)
    }

    pub fn min_bet(&self) -> Lamports {
        Lamports::from_sol(self.authority.min_bet_sol)
    }

    pub fn max_bet(&self) -> Lamports {
        Lamports::from_sol(self.authority.max_bet_sol)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue(String),
    LogicalInconsistency(String),
    MissingRequired(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigValidationError::LogicalInconsistency(msg) => {
                write!(f, "Configuration logical inconsistency: {}", msg)
            }
            ConfigValidationError::MissingRequired(msg) => write!(f, "Missing required configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}
