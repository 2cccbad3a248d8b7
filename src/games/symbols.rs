//! Symbol table: identities, display weights and payout multipliers

use crate::common::types::{Lamports, PayoutMultiplier};
use serde::Serialize;

/// Dense symbol identity in `0..N`
pub type SymbolId = u8;

/// Number of symbols in the standard table
pub const STANDARD_SYMBOL_COUNT: usize = 8;

/// Identity used when an authoritative identity is out of range (banana)
pub const DEFAULT_SYMBOL_ID: SymbolId = 7;

/// Immutable symbol definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: &'static str,
    /// Relative frequency during animation sampling
    pub display_weight: u32,
    /// Multiplier applied to the bet for three of a kind on the payline
    pub payout_multiplier: PayoutMultiplier,
}

impl Symbol {
    pub const fn new(id: SymbolId, name: &'static str, display_weight: u32, multiplier: u32) -> Self {
        Self {
            id,
            name,
            display_weight,
            payout_multiplier: PayoutMultiplier::whole(multiplier),
        }
    }
}

/// The game's symbol set, highest paying first
pub const STANDARD_SYMBOLS: [Symbol; STANDARD_SYMBOL_COUNT] = [
    Symbol::new(0, "gorbagana", 1, 100),
    Symbol::new(1, "wild", 2, 50),
    Symbol::new(2, "bonus_chest", 3, 25),
    Symbol::new(3, "trash", 4, 20),
    Symbol::new(4, "takeout", 5, 15),
    Symbol::new(5, "fish", 6, 10),
    Symbol::new(6, "rat", 7, 5),
    Symbol::new(7, "banana", 8, 2),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    #[error("Unknown symbol {id} (table has {count} symbols)")]
    UnknownSymbol { id: SymbolId, count: usize },

    #[error("Symbol at position {position} has identity {id}; identities must be dense and ordered")]
    NonDenseIdentity { position: usize, id: SymbolId },

    #[error("Symbol {id} has zero display weight")]
    ZeroWeight { id: SymbolId },

    #[error("Symbol table is empty")]
    Empty,

    #[error("Symbol table has {count} symbols; at most 256 identities are addressable")]
    TooManySymbols { count: usize },

    #[error("Default symbol {id} is outside the table")]
    DefaultOutOfRange { id: SymbolId },
}

/// One row of the pay table shown to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayTableEntry {
    pub symbol_id: SymbolId,
    pub name: &'static str,
    pub multiplier: PayoutMultiplier,
    /// Absolute payout for three of a kind at the given bet
    pub payout: Lamports,
}

/// Static registry indexed directly by identity.
///
/// Constructed once at startup and shared by reference (`Arc`) with the
/// sampler, the reconciler and the program adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    default_id: SymbolId,
}

impl SymbolTable {
    /// Build and validate a custom table
    pub fn new(symbols: Vec<Symbol>, default_id: SymbolId) -> Result<Self, SymbolError> {
        if symbols.is_empty() {
            return Err(SymbolError::Empty);
        }
        if symbols.len() > SymbolId::MAX as usize + 1 {
            return Err(SymbolError::TooManySymbols { count: symbols.len() });
        }
        for (position, symbol) in symbols.iter().enumerate() {
            if symbol.id as usize != position {
                return Err(SymbolError::NonDenseIdentity { position, id: symbol.id });
            }
            if symbol.display_weight == 0 {
                return Err(SymbolError::ZeroWeight { id: symbol.id });
            }
        }
        if default_id as usize >= symbols.len() {
            return Err(SymbolError::DefaultOutOfRange { id: default_id });
        }

        Ok(Self { symbols, default_id })
    }

    /// The standard eight-symbol table
    pub fn standard() -> Self {
        Self {
            symbols: STANDARD_SYMBOLS.to_vec(),
            default_id: DEFAULT_SYMBOL_ID,
        }
    }

    pub fn by_identity(&self, id: SymbolId) -> Result<&Symbol, SymbolError> {
        self.symbols.get(id as usize).ok_or(SymbolError::UnknownSymbol {
            id,
            count: self.symbols.len(),
        })
    }

    /// Lookup with the fallback-on-miss policy: unknown identities resolve to
    /// the default symbol instead of failing the spin.
    pub fn lookup_or_default(&self, id: SymbolId) -> &Symbol {
        match self.by_identity(id) {
            Ok(symbol) => symbol,
            Err(e) => {
                let fallback = self.default_symbol();
                tracing::warn!("{}; displaying '{}' instead", e, fallback.name);
                fallback
            }
        }
    }

    pub fn default_symbol(&self) -> &Symbol {
        &self.symbols[self.default_id as usize]
    }

    /// All symbols in identity order
    pub fn all(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        (id as usize) < self.symbols.len()
    }

    pub fn total_weight(&self) -> u64 {
        self.symbols.iter().map(|s| s.display_weight as u64).sum()
    }

    /// Pay table for `bet`, highest multiplier first
    pub fn pay_table(&self, bet: Lamports) -> Vec<PayTableEntry> {
        let mut entries: Vec<PayTableEntry> = self
            .symbols
            .iter()
            .map(|s| PayTableEntry {
                symbol_id: s.id,
                name: s.name,
                multiplier: s.payout_multiplier,
                payout: s.payout_multiplier.apply(bet),
            })
            .collect();
        entries.sort_by(|a, b| b.multiplier.cmp(&a.multiplier).then(a.symbol_id.cmp(&b.symbol_id)));
        entries
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_passes_validation() {
        let table = SymbolTable::new(STANDARD_SYMBOLS.to_vec(), DEFAULT_SYMBOL_ID)
            .expect("standard table must be valid");
        assert_eq!(table, SymbolTable::standard());
        assert_eq!(table.len(), STANDARD_SYMBOL_COUNT);
        assert_eq!(table.total_weight(), 36);
    }

    #[test]
    fn test_lookup_by_identity() {
        let table = SymbolTable::standard();
        for id in 0..STANDARD_SYMBOL_COUNT as u8 {
            assert_eq!(table.by_identity(id).unwrap().id, id);
        }
        assert_eq!(table.by_identity(0).unwrap().name, "gorbagana");
        assert_eq!(
            table.by_identity(8),
            Err(SymbolError::UnknownSymbol { id: 8, count: 8 })
        );
    }

    #[test]
    fn test_unknown_identity_falls_back_to_default() {
        let table = SymbolTable::standard();
        assert_eq!(table.lookup_or_default(42).name, "banana");
        assert_eq!(table.lookup_or_default(3).name, "trash");
    }

    #[test]
    fn test_all_is_stable() {
        let table = SymbolTable::standard();
        let first: Vec<SymbolId> = table.all().iter().map(|s| s.id).collect();
        let second: Vec<SymbolId> = table.all().iter().map(|s| s.id).collect();
        assert_eq!(first, second);
        assert_eq!(first, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert_eq!(SymbolTable::new(vec![], 0), Err(SymbolError::Empty));

        let gap = vec![Symbol::new(0, "a", 1, 2), Symbol::new(2, "b", 1, 2)];
        assert_eq!(
            SymbolTable::new(gap, 0),
            Err(SymbolError::NonDenseIdentity { position: 1, id: 2 })
        );

        let weightless = vec![Symbol::new(0, "a", 0, 2)];
        assert_eq!(
            SymbolTable::new(weightless, 0),
            Err(SymbolError::ZeroWeight { id: 0 })
        );

        let single = vec![Symbol::new(0, "a", 1, 2)];
        assert_eq!(
            SymbolTable::new(single, 1),
            Err(SymbolError::DefaultOutOfRange { id: 1 })
        );
    }

    #[test]
    fn test_pay_table_sorted_by_payout() {
        let table = SymbolTable::standard();
        let bet = Lamports::from_sol(0.01);
        let pay_table = table.pay_table(bet);

        assert_eq!(pay_table.len(), 8);
        assert_eq!(pay_table[0].name, "gorbagana");
        assert_eq!(pay_table[0].payout, Lamports::from_sol(1.0));
        assert_eq!(pay_table[7].name, "banana");
        assert!(pay_table.windows(2).all(|w| w[0].multiplier >= w[1].multiplier));
    }
}
