//! Error types for the slots engine
//!
//! Precondition failures are rejected before any spin starts, authority
//! failures are caught at the spin boundary, and symbol lookups never fail a
//! spin (the reconciler falls back to the default symbol).

use crate::authority::AuthorityError;
use crate::common::types::Lamports;
use crate::games::symbols::SymbolError;
use std::fmt;

/// Root error type for all slots engine operations
#[derive(Debug)]
pub enum SlotsError {
    /// Configuration loading and validation errors
    Configuration(ConfigurationError),

    /// Spin rejected before any state change
    Precondition(PreconditionError),

    /// The outcome authority failed or rejected the spin
    Authority(AuthorityError),

    /// Symbol table construction or lookup errors
    Symbol(SymbolError),
}

/// Configuration and validation errors
#[derive(Debug)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
    SaveFailed(String),
}

/// Spin preconditions checked by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// No wallet/session is connected to the authority
    NotConnected,
    /// A spin is already in flight
    AlreadySpinning,
    /// Available balance does not cover the bet
    InsufficientBalance { balance: Lamports, bet: Lamports },
    /// Bet is not one of the allowed denominations
    UnsupportedBet(Lamports),
}

impl fmt::Display for SlotsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotsError::Configuration(e) => write!(f, "Configuration error: {}", e),
            SlotsError::Precondition(e) => write!(f, "Spin rejected: {}", e),
            SlotsError::Authority(e) => write!(f, "Authority error: {}", e),
            SlotsError::Symbol(e) => write!(f, "Symbol error: {}", e),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
            ConfigurationError::SaveFailed(msg) => write!(f, "Failed to save configuration: {}", msg),
        }
    }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::NotConnected => write!(f, "Please connect your wallet first"),
            PreconditionError::AlreadySpinning => write!(f, "A spin is already in progress"),
            PreconditionError::InsufficientBalance { .. } => write!(f, "Insufficient balance"),
            PreconditionError::UnsupportedBet(bet) => write!(f, "Unsupported bet amount: {}", bet),
        }
    }
}

impl std::error::Error for SlotsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SlotsError::Configuration(e) => Some(e),
            SlotsError::Precondition(e) => Some(e),
            SlotsError::Authority(e) => Some(e),
            SlotsError::Symbol(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigurationError {}
impl std::error::Error for PreconditionError {}

impl From<ConfigurationError> for SlotsError {
    fn from(e: ConfigurationError) -> Self {
        SlotsError::Configuration(e)
    }
}

impl From<PreconditionError> for SlotsError {
    fn from(e: PreconditionError) -> Self {
        SlotsError::Precondition(e)
    }
}

impl From<AuthorityError> for SlotsError {
    fn from(e: AuthorityError) -> Self {
        SlotsError::Authority(e)
    }
}

impl From<SymbolError> for SlotsError {
    fn from(e: SymbolError) -> Self {
        SlotsError::Symbol(e)
    }
}

impl From<std::io::Error> for SlotsError {
    fn from(e: std::io::Error) -> Self {
        SlotsError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<toml::de::Error> for SlotsError {
    fn from(e: toml::de::Error) -> Self {
        SlotsError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type SlotsResult<T> = Result<T, SlotsError>;
