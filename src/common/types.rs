//! Shared type definitions for the slots engine
//!
//! Currency and payout primitives used by the symbol table, the reconciler,
//! the program adapter and the state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Integer currency amount in lamports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lamports(pub u64);

impl Lamports {
    pub const ZERO: Lamports = Lamports(0);

    /// Convert a SOL amount to lamports, flooring the fractional lamport.
    ///
    /// Negative, NaN and infinite inputs map to zero.
    pub fn from_sol(sol: f64) -> Self {
        if !sol.is_finite() || sol <= 0.0 {
            return Self::ZERO;
        }
        let lamports = (sol * LAMPORTS_PER_SOL as f64).floor();
        if lamports >= u64::MAX as f64 {
            Self(u64::MAX)
        } else {
            Self(lamports as u64)
        }
    }

    pub fn as_sol(self) -> f64 {
        self.0 as f64 / LAMPORTS_PER_SOL as f64
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Lamports) -> Lamports {
        Lamports(self.0.saturating_add(other.0))
    }

    pub fn checked_sub(self, other: Lamports) -> Option<Lamports> {
        self.0.checked_sub(other.0).map(Lamports)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} SOL", self.as_sol())
    }
}

/// Non-negative rational payout multiplier applied to the bet on a winning payline
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PayoutMultiplier {
    numerator: u32,
    denominator: u32,
}

impl PayoutMultiplier {
    pub const ZERO: PayoutMultiplier = PayoutMultiplier::whole(0);

    /// Whole-number multiplier (`x100`)
    pub const fn whole(value: u32) -> Self {
        Self {
            numerator: value,
            denominator: 1,
        }
    }

    /// Fractional multiplier; returns `None` for a zero denominator
    pub const fn ratio(numerator: u32, denominator: u32) -> Option<Self> {
        if denominator == 0 {
            None
        } else {
            Some(Self {
                numerator,
                denominator,
            })
        }
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Payout for `bet`, rounded down to whole lamports
    pub fn apply(&self, bet: Lamports) -> Lamports {
        if self.denominator == 0 {
            return Lamports::ZERO;
        }
        let scaled = bet.0 as u128 * self.numerator as u128 / self.denominator as u128;
        Lamports(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }
}

impl PartialEq for PayoutMultiplier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for PayoutMultiplier {}

impl PartialOrd for PayoutMultiplier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PayoutMultiplier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // a/b vs c/d  <=>  a*d vs c*b
        let lhs = self.numerator as u64 * other.denominator as u64;
        let rhs = other.numerator as u64 * self.denominator as u64;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for PayoutMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "x{}", self.numerator)
        } else {
            write!(f, "x{}/{}", self.numerator, self.denominator)
        }
    }
}
