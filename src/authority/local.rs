use crate::common::types::Lamports;
use crate::games::symbols::{SymbolId, SymbolTable};
use crate::games::types::SpinOutcome;
use rand::Rng;

/// Client-side roll used when no authority is configured.
///
/// Identities are drawn uniformly, not by display weight. The returned payout
/// is always zero; the reconciler settles local spins itself.
#[derive(Debug, Clone, Copy)]
pub struct LocalFallback {
    symbol_count: usize,
}

impl LocalFallback {
    pub fn new(table: &SymbolTable) -> Self {
        Self {
            symbol_count: table.len(),
        }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> SpinOutcome {
        let payline_symbols = std::array::from_fn(|_| rng.gen_range(0..self.symbol_count) as SymbolId);
        SpinOutcome {
            payline_symbols,
            payout: Lamports::ZERO,
        }
    }
}
