//! Gorbagana Slots - spin resolution engine
//!
//! A 3x3 slot machine whose payline outcome comes from an external authority
//! (or a local fallback roll). The engine animates the grid with weighted
//! random frames while the authority call is in flight, reconciles the
//! canonical outcome into a final grid and payout, and publishes session
//! state for presentation.

pub mod animation;
pub mod authority;
pub mod common;
pub mod config;
pub mod errors;
pub mod games;
pub mod metrics;
pub mod session;
pub mod spin_machine;

pub use authority::{AuthorityError, LocalFallback, ProgramAuthority, SlotsProgram, SpinAuthority};
pub use common::types::{Lamports, PayoutMultiplier, LAMPORTS_PER_SOL};
pub use config::SlotsConfig;
pub use errors::{PreconditionError, SlotsError, SlotsResult};
pub use games::{Grid, OutcomeReconciler, OutcomeSource, Reconciliation, SpinOutcome, SymbolTable, WeightedSampler};
pub use session::{SpinPhase, SpinSession};
pub use spin_machine::{SpinFailure, SpinHandle, SpinMachine, SpinReport, WalletStatus, SPIN_INTERRUPTED};
