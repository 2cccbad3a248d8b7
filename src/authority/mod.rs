//! Outcome authorities
//!
//! The state machine consumes outcomes through the `SpinAuthority` trait.
//! `program` hosts the in-process slots program and its adapter; `local` is
//! the client-side roll used when no authority is configured.

pub mod local;
pub mod program;

use crate::common::types::Lamports;
use crate::games::symbols::SymbolId;
use crate::games::types::{SpinOutcome, GRID_COLS};
use serde::{Deserialize, Serialize};

pub use crate::common::traits::SpinAuthority;
pub use local::LocalFallback;
pub use program::{ProgramAuthority, ProgramEvent, SlotsProgram, SlotsState, SpinReceipt};

/// Failures reported by an outcome authority
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    #[error("Bet amount is below the minimum")]
    InvalidBetAmount,

    #[error("Bet amount exceeds the maximum")]
    BetTooHigh,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Lamports, required: Lamports },

    #[error("Slots state not initialized for {0}")]
    NotInitialized(String),

    #[error("Program error {code}: {message}")]
    Program { code: u32, message: String },

    #[error("Malformed outcome: {0}")]
    MalformedOutcome(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authority did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl AuthorityError {
    /// Map a custom program error code to its typed variant
    pub fn from_program_code(code: u32) -> Self {
        match code {
            6000 => AuthorityError::InvalidBetAmount,
            6001 => AuthorityError::BetTooHigh,
            6002 => AuthorityError::InvalidAmount,
            other => AuthorityError::Program {
                code: other,
                message: "Unknown program error".to_string(),
            },
        }
    }

    /// The program's error code, when this error came from the program
    pub fn program_code(&self) -> Option<u32> {
        match self {
            AuthorityError::InvalidBetAmount => Some(6000),
            AuthorityError::BetTooHigh => Some(6001),
            AuthorityError::InvalidAmount => Some(6002),
            AuthorityError::Program { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Outcome as emitted by the program's `SpinResult` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpinOutcome {
    pub symbols: Vec<u8>,
    pub payout: u64,
}

impl TryFrom<RawSpinOutcome> for SpinOutcome {
    type Error = AuthorityError;

    fn try_from(raw: RawSpinOutcome) -> Result<Self, Self::Error> {
        let payline_symbols: [SymbolId; GRID_COLS] =
            raw.symbols.as_slice().try_into().map_err(|_| {
                AuthorityError::MalformedOutcome(format!(
                    "expected {} payline symbols, got {}",
                    GRID_COLS,
                    raw.symbols.len()
                ))
            })?;

        Ok(SpinOutcome {
            payline_symbols,
            payout: Lamports(raw.payout),
        })
    }
}

impl From<SpinOutcome> for RawSpinOutcome {
    fn from(outcome: SpinOutcome) -> Self {
        Self {
            symbols: outcome.payline_symbols.to_vec(),
            payout: outcome.payout.get(),
        }
    }
}
