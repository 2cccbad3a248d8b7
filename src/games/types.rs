use crate::common::types::Lamports;
use crate::games::symbols::SymbolId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const GRID_ROWS: usize = 3;
pub const GRID_COLS: usize = 3;

/// Index of the middle row, the only row that pays
pub const PAYLINE_ROW: usize = 1;

/// Row indices highlighted as winning lines
pub type HighlightedRows = BTreeSet<usize>;

/// Fixed 3x3 matrix of symbol identities, row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    rows: [[SymbolId; GRID_COLS]; GRID_ROWS],
}

impl Grid {
    pub fn from_rows(rows: [[SymbolId; GRID_COLS]; GRID_ROWS]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[SymbolId; GRID_COLS]; GRID_ROWS] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[SymbolId; GRID_COLS]> {
        self.rows.get(index)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<SymbolId> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// The authoritative middle row
    pub fn payline(&self) -> [SymbolId; GRID_COLS] {
        self.rows[PAYLINE_ROW]
    }

    /// Cells in row-major order, as laid out on screen
    pub fn cells(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.rows.iter().flat_map(|row| row.iter().copied())
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                write!(f, " / ")?;
            }
            write!(f, "{} {} {}", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}

/// Canonical spin result: the three payline identities and the payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub payline_symbols: [SymbolId; GRID_COLS],
    pub payout: Lamports,
}

/// Where a spin result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    /// Result and payout computed by the external authority
    Authority,
    /// Client-side roll and payout, used when no authority is configured
    LocalFallback,
}

impl fmt::Display for OutcomeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeSource::Authority => write!(f, "authority"),
            OutcomeSource::LocalFallback => write!(f, "local_fallback"),
        }
    }
}

/// Final display state built from an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub grid: Grid,
    pub payout: Lamports,
    pub highlighted_rows: HighlightedRows,
    pub source: OutcomeSource,
}

impl Reconciliation {
    pub fn is_win(&self) -> bool {
        !self.payout.is_zero()
    }
}
