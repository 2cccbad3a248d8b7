//! In-process slots program
//!
//! Stands in for the on-chain program the client talks to: per-player state
//! accounts, bet validation with the program's error codes, VRF-derived reels
//! and `SpinRequested`/`SpinResult` events. `ProgramAuthority` exposes it to
//! the state machine through `SpinAuthority`.

use crate::authority::{AuthorityError, RawSpinOutcome};
use crate::common::traits::SpinAuthority;
use crate::common::types::Lamports;
use crate::games::symbols::{SymbolId, SymbolTable};
use crate::games::types::{SpinOutcome, GRID_COLS};
use crate::games::vrf_engine::{VRFBundle, VRFGameEngine};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

const STATE_SEED: &[u8] = b"slots_state";
const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Per-player program account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotsState {
    pub authority: String,
    pub initialized: bool,
    pub treasury: String,
    pub total_spins: u64,
    pub total_payout: Lamports,
    pub house_edge: u8,
}

/// Events emitted by the program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgramEvent {
    SpinRequested {
        player: String,
        bet: Lamports,
        signature: String,
        timestamp: DateTime<Utc>,
    },
    SpinResult {
        player: String,
        symbols: [SymbolId; GRID_COLS],
        payout: Lamports,
        signature: String,
        timestamp: DateTime<Utc>,
    },
}

/// Bet bounds enforced by the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetLimits {
    pub min_bet: Lamports,
    pub max_bet: Lamports,
}

/// Result of a confirmed spin instruction
#[derive(Debug, Clone)]
pub struct SpinReceipt {
    pub signature: String,
    pub outcome: SpinOutcome,
    pub vrf: VRFBundle,
}

pub struct SlotsProgram {
    vrf: Arc<VRFGameEngine>,
    table: Arc<SymbolTable>,
    limits: BetLimits,
    house_edge: u8,
    states: DashMap<String, SlotsState>,
    balances: DashMap<String, Lamports>,
    events: broadcast::Sender<ProgramEvent>,
}

impl SlotsProgram {
    pub fn new(vrf: Arc<VRFGameEngine>, table: Arc<SymbolTable>, limits: BetLimits, house_edge: u8) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            vrf,
            table,
            limits,
            house_edge,
            states: DashMap::new(),
            balances: DashMap::new(),
            events,
        }
    }

    /// Derived address of a player's state account
    pub fn slots_state_address(player: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(STATE_SEED);
        hasher.update(player.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn limits(&self) -> BetLimits {
        self.limits
    }

    pub fn vrf_public_key(&self) -> String {
        self.vrf.public_key_hex()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgramEvent> {
        self.events.subscribe()
    }

    /// Credit a player's account
    pub fn fund(&self, player: &str, amount: Lamports) -> Lamports {
        let mut entry = self.balances.entry(player.to_string()).or_insert(Lamports::ZERO);
        *entry = entry.saturating_add(amount);
        *entry
    }

    pub fn balance(&self, player: &str) -> Lamports {
        self.balances.get(player).map(|b| *b).unwrap_or(Lamports::ZERO)
    }

    /// Create the player's state account; re-initializing keeps the totals
    pub fn initialize(&self, player: &str, authority: &str, treasury: &str) -> SlotsState {
        let address = Self::slots_state_address(player);
        let mut state = self.states.entry(address.clone()).or_insert_with(|| SlotsState {
            authority: authority.to_string(),
            initialized: false,
            treasury: treasury.to_string(),
            total_spins: 0,
            total_payout: Lamports::ZERO,
            house_edge: self.house_edge,
        });
        state.authority = authority.to_string();
        state.treasury = treasury.to_string();
        state.initialized = true;

        info!("Initialized slots state {} for {}", address, player);
        state.clone()
    }

    pub fn state(&self, player: &str) -> Option<SlotsState> {
        self.states
            .get(&Self::slots_state_address(player))
            .map(|s| s.clone())
    }

    fn validate_bet(&self, bet: Lamports) -> Result<(), AuthorityError> {
        if bet.is_zero() {
            return Err(AuthorityError::InvalidAmount);
        }
        if bet < self.limits.min_bet {
            return Err(AuthorityError::InvalidBetAmount);
        }
        if bet > self.limits.max_bet {
            return Err(AuthorityError::BetTooHigh);
        }
        Ok(())
    }

    /// Execute the spin instruction for `player`
    pub fn spin(&self, player: &str, bet: Lamports) -> Result<SpinReceipt, AuthorityError> {
        self.validate_bet(bet)?;

        let address = Self::slots_state_address(player);
        let initialized = self.states.get(&address).map(|s| s.initialized).unwrap_or(false);
        if !initialized {
            return Err(AuthorityError::NotInitialized(player.to_string()));
        }

        let available = self.balance(player);
        if available < bet {
            return Err(AuthorityError::InsufficientFunds {
                balance: available,
                required: bet,
            });
        }

        let signature = Uuid::new_v4().to_string();
        let _ = self.events.send(ProgramEvent::SpinRequested {
            player: player.to_string(),
            bet,
            signature: signature.clone(),
            timestamp: Utc::now(),
        });

        // Nothing is written to the account until the payline is known
        let (vrf, symbols) = self.draw(&signature, player, bet)?;
        let payout = self.payout_for(&symbols, bet);

        {
            let mut balance = self.balances.entry(player.to_string()).or_insert(Lamports::ZERO);
            let debited = balance.checked_sub(bet).ok_or(AuthorityError::InsufficientFunds {
                balance: *balance,
                required: bet,
            })?;
            *balance = debited.saturating_add(payout);
        }
        if let Some(mut state) = self.states.get_mut(&address) {
            state.total_spins += 1;
            state.total_payout = state.total_payout.saturating_add(payout);
        }

        debug!("Spin {} for {}: {:?} pays {}", signature, player, symbols, payout);
        let _ = self.events.send(ProgramEvent::SpinResult {
            player: player.to_string(),
            symbols,
            payout,
            signature: signature.clone(),
            timestamp: Utc::now(),
        });

        // Round-trip through the event shape the client decodes
        let raw = RawSpinOutcome {
            symbols: symbols.to_vec(),
            payout: payout.get(),
        };
        Ok(SpinReceipt {
            signature,
            outcome: SpinOutcome::try_from(raw)?,
            vrf,
        })
    }

    fn draw(&self, signature: &str, player: &str, bet: Lamports) -> Result<(VRFBundle, [SymbolId; GRID_COLS]), AuthorityError> {
        let vrf = self
            .vrf
            .generate_outcome(signature, player, bet.get())
            .map_err(AuthorityError::Transport)?;
        let output = hex::decode(&vrf.vrf_output)
            .map_err(|e| AuthorityError::MalformedOutcome(format!("VRF output: {}", e)))?;
        let symbols = VRFGameEngine::compute_payline(&output, &self.table);
        Ok((vrf, symbols))
    }

    fn payout_for(&self, symbols: &[SymbolId; GRID_COLS], bet: Lamports) -> Lamports {
        let [a, b, c] = *symbols;
        if a != b || b != c {
            return Lamports::ZERO;
        }
        self.table
            .by_identity(a)
            .map(|s| s.payout_multiplier.apply(bet))
            .unwrap_or(Lamports::ZERO)
    }
}

/// `SpinAuthority` backed by a `SlotsProgram` account
pub struct ProgramAuthority {
    program: Arc<SlotsProgram>,
    player: String,
    latency: Duration,
}

impl ProgramAuthority {
    pub fn new(program: Arc<SlotsProgram>, player: impl Into<String>) -> Self {
        Self {
            program,
            player: player.into(),
            latency: Duration::ZERO,
        }
    }

    /// Simulated confirmation latency before the result is available
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn program(&self) -> &Arc<SlotsProgram> {
        &self.program
    }

    pub fn player(&self) -> &str {
        &self.player
    }
}

#[async_trait]
impl SpinAuthority for ProgramAuthority {
    async fn spin(&self, bet: Lamports) -> Result<SpinOutcome, AuthorityError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let receipt = self.program.spin(&self.player, bet)?;
        info!("Spin confirmed: {}", receipt.signature);
        Ok(receipt.outcome)
    }
}
