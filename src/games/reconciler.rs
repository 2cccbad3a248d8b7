//! Outcome reconciliation
//!
//! Turns a `SpinOutcome` plus the bet into the final grid, the displayed
//! payout and the highlighted rows. The middle row comes from the outcome;
//! top and bottom rows are re-sampled decoration and never affect payout or
//! highlighting.

use crate::common::types::Lamports;
use crate::games::sampler::WeightedSampler;
use crate::games::symbols::{SymbolId, SymbolTable};
use crate::games::types::{
    Grid, HighlightedRows, OutcomeSource, Reconciliation, SpinOutcome, GRID_COLS, PAYLINE_ROW,
};
use rand::Rng;
use std::sync::Arc;

/// Highlighted rows depend on the payout alone
pub fn highlighted_rows_for(payout: Lamports) -> HighlightedRows {
    let mut rows = HighlightedRows::new();
    if !payout.is_zero() {
        rows.insert(PAYLINE_ROW);
    }
    rows
}

pub struct OutcomeReconciler {
    sampler: Arc<WeightedSampler>,
}

impl OutcomeReconciler {
    pub fn new(sampler: Arc<WeightedSampler>) -> Self {
        Self { sampler }
    }

    pub fn table(&self) -> &SymbolTable {
        self.sampler.table()
    }

    /// Build the final grid and payout for `outcome`.
    ///
    /// With `OutcomeSource::Authority` the outcome's payout is taken as-is.
    /// With `OutcomeSource::LocalFallback` the payout is computed here and the
    /// outcome's payout field is ignored.
    pub fn reconcile<R: Rng + ?Sized>(
        &self,
        outcome: &SpinOutcome,
        bet: Lamports,
        source: OutcomeSource,
        rng: &mut R,
    ) -> Reconciliation {
        let table = self.table();
        let payline: [SymbolId; GRID_COLS] =
            outcome.payline_symbols.map(|id| table.lookup_or_default(id).id);

        let top = self.sampler.sample_row(rng);
        let bottom = self.sampler.sample_row(rng);
        let grid = Grid::from_rows([top, payline, bottom]);

        let payout = match source {
            OutcomeSource::Authority => outcome.payout,
            OutcomeSource::LocalFallback => self.local_payout(&outcome.payline_symbols, bet),
        };

        Reconciliation {
            grid,
            payout,
            highlighted_rows: highlighted_rows_for(payout),
            source,
        }
    }

    /// Client-side payout: three equal identities pay `multiplier * bet`,
    /// anything else (including an unknown identity) pays nothing.
    pub fn local_payout(&self, payline: &[SymbolId; GRID_COLS], bet: Lamports) -> Lamports {
        let [a, b, c] = *payline;
        if a != b || b != c {
            return Lamports::ZERO;
        }
        match self.table().by_identity(a) {
            Ok(symbol) => symbol.payout_multiplier.apply(bet),
            Err(_) => Lamports::ZERO,
        }
    }
}
