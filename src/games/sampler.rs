//! Weighted animation sampler
//!
//! Draws symbols with probability `display_weight / total_weight` by
//! replicating each identity `display_weight` times into a flat pool and
//! drawing a uniform index. Used only for animation frames and decorative
//! rows; it never decides a payout.

use crate::games::symbols::{Symbol, SymbolId, SymbolTable};
use crate::games::types::{Grid, GRID_COLS, GRID_ROWS};
use rand::Rng;
use std::sync::Arc;

pub struct WeightedSampler {
    table: Arc<SymbolTable>,
    pool: Vec<SymbolId>,
}

impl WeightedSampler {
    pub fn new(table: Arc<SymbolTable>) -> Self {
        let pool = table
            .all()
            .iter()
            .flat_map(|s| std::iter::repeat(s.id).take(s.display_weight as usize))
            .collect();
        Self { table, pool }
    }

    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }

    /// Size of the expanded pool (equals the table's total weight)
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn sample_id<R: Rng + ?Sized>(&self, rng: &mut R) -> SymbolId {
        // Table validation guarantees a non-empty pool.
        self.pool[rng.gen_range(0..self.pool.len())]
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &Symbol {
        self.table.lookup_or_default(self.sample_id(rng))
    }

    pub fn sample_row<R: Rng + ?Sized>(&self, rng: &mut R) -> [SymbolId; GRID_COLS] {
        std::array::from_fn(|_| self.sample_id(rng))
    }

    /// Fresh animation frame for the whole grid
    pub fn sample_grid<R: Rng + ?Sized>(&self, rng: &mut R) -> Grid {
        let rows: [[SymbolId; GRID_COLS]; GRID_ROWS] = std::array::from_fn(|_| self.sample_row(rng));
        Grid::from_rows(rows)
    }
}
