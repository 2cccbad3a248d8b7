//! Observable spin session state

use crate::common::types::Lamports;
use crate::games::types::{Grid, HighlightedRows, OutcomeSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPhase {
    Idle,
    /// Sampler ticking, authority call in flight
    Animating,
    /// Outcome received, waiting out the minimum spin duration
    Resolving,
    /// Last spin failed; the message clears on a timer
    Error,
}

impl fmt::Display for SpinPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpinPhase::Idle => "idle",
            SpinPhase::Animating => "animating",
            SpinPhase::Resolving => "resolving",
            SpinPhase::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot published to presentation after every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSession {
    pub phase: SpinPhase,
    pub is_spinning: bool,
    pub grid: Grid,
    pub last_payout: Lamports,
    pub highlighted_rows: HighlightedRows,
    pub pending_error: Option<String>,
    /// Whether the last settled result came from the authority or the local roll
    pub last_source: Option<OutcomeSource>,
    pub spin_count: u64,
    pub current_bet: Option<Lamports>,
}

impl SpinSession {
    pub fn new(grid: Grid) -> Self {
        Self {
            phase: SpinPhase::Idle,
            is_spinning: false,
            grid,
            last_payout: Lamports::ZERO,
            highlighted_rows: HighlightedRows::new(),
            pending_error: None,
            last_source: None,
            spin_count: 0,
            current_bet: None,
        }
    }

    /// Reset for a new spin: clears payout, highlights and any shown error
    pub(crate) fn begin_spin(&mut self, bet: Lamports) {
        self.phase = SpinPhase::Animating;
        self.is_spinning = true;
        self.last_payout = Lamports::ZERO;
        self.highlighted_rows.clear();
        self.pending_error = None;
        self.current_bet = Some(bet);
        self.spin_count += 1;
    }
}
