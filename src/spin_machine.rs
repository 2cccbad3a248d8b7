//! Spin state machine
//!
//! Orchestrates one spin at a time:
//!
//! ```text
//! Idle --start_spin--> Animating --outcome--> Resolving --min duration--> Idle
//!   any stage --failure--> Error --error_display--> Idle
//! ```
//!
//! Session state is published on a `watch` channel. Only the machine and the
//! animation ticker it owns write to it.

use crate::animation::AnimationTicker;
use crate::authority::{AuthorityError, LocalFallback};
use crate::common::traits::SpinAuthority;
use crate::common::types::Lamports;
use crate::config::SlotsConfig;
use crate::errors::{ConfigurationError, PreconditionError, SlotsResult};
use crate::games::reconciler::OutcomeReconciler;
use crate::games::sampler::WeightedSampler;
use crate::games::symbols::{PayTableEntry, SymbolTable};
use crate::games::types::{Grid, OutcomeSource, Reconciliation, SpinOutcome};
use crate::metrics::SpinMetrics;
use crate::session::{SpinPhase, SpinSession};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, info_span, warn, Instrument};

/// Wallet state pushed by the wallet layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletStatus {
    pub connected: bool,
    pub balance: Lamports,
}

impl WalletStatus {
    pub fn connected(balance: Lamports) -> Self {
        Self {
            connected: true,
            balance,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// Why a started spin did not settle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpinFailure {
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// Wallet changed between `start_spin` and the authority call
    #[error(transparent)]
    Precondition(PreconditionError),
}

/// Terminal result of a spin task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinReport {
    Settled(Reconciliation),
    Failed(SpinFailure),
}

impl SpinReport {
    pub fn reconciliation(&self) -> Option<&Reconciliation> {
        match self {
            SpinReport::Settled(r) => Some(r),
            SpinReport::Failed(_) => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, SpinReport::Settled(_))
    }
}

/// Handle to an in-flight spin. Dropping it does not cancel the spin.
pub struct SpinHandle {
    spin_number: u64,
    join: JoinHandle<SpinReport>,
}

impl SpinHandle {
    pub fn spin_number(&self) -> u64 {
        self.spin_number
    }

    pub async fn wait(self) -> Result<SpinReport, JoinError> {
        self.join.await
    }
}

/// Shown when a spin task stops without producing a result
pub const SPIN_INTERRUPTED: &str = "Spin interrupted, please try again";

struct Inner {
    config: SlotsConfig,
    sampler: Arc<WeightedSampler>,
    reconciler: OutcomeReconciler,
    authority: Option<Arc<dyn SpinAuthority>>,
    local: LocalFallback,
    allowed_bets: Vec<Lamports>,
    state: Arc<watch::Sender<SpinSession>>,
    wallet: watch::Sender<WalletStatus>,
    rng: Mutex<StdRng>,
    metrics: Arc<SpinMetrics>,
    /// Bumped on every spin start and every new error; a clear timer only
    /// fires if the epoch it was scheduled under is still current.
    error_epoch: AtomicU64,
}

/// Cloneable handle to the spin engine
#[derive(Clone)]
pub struct SpinMachine {
    inner: Arc<Inner>,
}

pub struct SpinMachineBuilder {
    config: SlotsConfig,
    table: Option<Arc<SymbolTable>>,
    authority: Option<Arc<dyn SpinAuthority>>,
    wallet: WalletStatus,
    seed: Option<u64>,
}

impl SpinMachineBuilder {
    pub fn symbol_table(mut self, table: Arc<SymbolTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// Use `authority` for outcomes; without one the machine runs in local-fallback mode
    pub fn authority(mut self, authority: Arc<dyn SpinAuthority>) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn wallet(mut self, wallet: WalletStatus) -> Self {
        self.wallet = wallet;
        self
    }

    /// Seed for animation, decorative rows and local rolls; overrides `sampling.seed`
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> SlotsResult<SpinMachine> {
        self.config
            .validate()
            .map_err(|e| ConfigurationError::ValidationFailed(e.to_string()))?;

        let table = self.table.unwrap_or_else(|| Arc::new(SymbolTable::standard()));
        let sampler = Arc::new(WeightedSampler::new(table.clone()));
        let mut rng = match self.seed.or(self.config.sampling.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let initial = SpinSession::new(sampler.sample_grid(&mut rng));
        let (state, _) = watch::channel(initial);
        let (wallet, _) = watch::channel(self.wallet);

        info!(
            "Spin machine ready: {} symbols, {} mode",
            table.len(),
            if self.authority.is_some() { "authority" } else { "local fallback" }
        );

        Ok(SpinMachine {
            inner: Arc::new(Inner {
                allowed_bets: self.config.allowed_bets(),
                config: self.config,
                reconciler: OutcomeReconciler::new(sampler.clone()),
                local: LocalFallback::new(&table),
                sampler,
                authority: self.authority,
                state: Arc::new(state),
                wallet,
                rng: Mutex::new(rng),
                metrics: Arc::new(SpinMetrics::new()),
                error_epoch: AtomicU64::new(0),
            }),
        })
    }
}

impl SpinMachine {
    pub fn builder(config: SlotsConfig) -> SpinMachineBuilder {
        SpinMachineBuilder {
            config,
            table: None,
            authority: None,
            wallet: WalletStatus::default(),
            seed: None,
        }
    }

    /// Begin a spin for `bet`.
    ///
    /// Preconditions are checked atomically with the spinning guard. A call
    /// while a spin is in flight returns `AlreadySpinning` without touching
    /// the session; other violations surface `pending_error` and leave the
    /// phase as it was. Must be called from within a Tokio runtime.
    pub fn start_spin(&self, bet: Lamports) -> Result<SpinHandle, PreconditionError> {
        let inner = &self.inner;
        let wallet = *inner.wallet.borrow();
        let mut verdict: Result<(Grid, u64), PreconditionError> = Err(PreconditionError::AlreadySpinning);
        let mut epoch = 0;

        // Epoch moves under the session lock, before any new message is visible
        inner.state.send_if_modified(|session| {
            if session.is_spinning {
                return false;
            }
            epoch = inner.error_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            if let Err(e) = inner.check_preconditions(wallet, bet) {
                session.pending_error = Some(e.to_string());
                verdict = Err(e);
                return true;
            }
            let previous_grid = session.grid;
            session.begin_spin(bet);
            verdict = Ok((previous_grid, session.spin_count));
            true
        });

        match verdict {
            Ok((previous_grid, spin_number)) => {
                inner.metrics.record_spin_started();

                let span = info_span!("spin", number = spin_number, bet = %bet);
                let join = tokio::spawn(inner.clone().run_spin(bet, previous_grid).instrument(span));
                Ok(SpinHandle { spin_number, join })
            }
            Err(PreconditionError::AlreadySpinning) => {
                debug!("Spin ignored: already spinning");
                Err(PreconditionError::AlreadySpinning)
            }
            Err(e) => {
                inner.metrics.record_precondition_rejection();
                warn!("Spin rejected: {}", e);
                inner.schedule_error_clear(epoch);
                Err(e)
            }
        }
    }

    /// Push new wallet state from the wallet layer
    pub fn update_wallet(&self, wallet: WalletStatus) {
        self.inner.wallet.send_replace(wallet);
    }

    pub fn wallet(&self) -> WalletStatus {
        *self.inner.wallet.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SpinSession> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SpinSession {
        self.inner.state.borrow().clone()
    }

    pub fn metrics(&self) -> Arc<SpinMetrics> {
        self.inner.metrics.clone()
    }

    pub fn config(&self) -> &SlotsConfig {
        &self.inner.config
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        self.inner.sampler.table()
    }

    pub fn pay_table(&self, bet: Lamports) -> Vec<PayTableEntry> {
        self.symbol_table().pay_table(bet)
    }

    pub fn allowed_bets(&self) -> &[Lamports] {
        &self.inner.allowed_bets
    }

    /// True when no authority is configured and payouts are computed locally
    pub fn is_local_mode(&self) -> bool {
        self.inner.authority.is_none()
    }
}

impl Inner {
    fn check_preconditions(&self, wallet: WalletStatus, bet: Lamports) -> Result<(), PreconditionError> {
        if !wallet.connected {
            return Err(PreconditionError::NotConnected);
        }
        if !self.allowed_bets.contains(&bet) {
            return Err(PreconditionError::UnsupportedBet(bet));
        }
        if wallet.balance < bet {
            return Err(PreconditionError::InsufficientBalance {
                balance: wallet.balance,
                bet,
            });
        }
        Ok(())
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Independent generator for a spawned task
    fn child_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.rng().gen())
    }

    fn roll_local(&self) -> SpinOutcome {
        let mut rng = self.rng();
        self.local.roll(&mut *rng)
    }

    fn reconcile(&self, outcome: &SpinOutcome, bet: Lamports, source: OutcomeSource) -> Reconciliation {
        let mut rng = self.rng();
        self.reconciler.reconcile(outcome, bet, source, &mut *rng)
    }

    async fn run_spin(self: Arc<Self>, bet: Lamports, previous_grid: Grid) -> SpinReport {
        let guard = SpinGuard {
            inner: self.clone(),
            previous_grid,
            armed: true,
        };
        let report = self.resolve_spin(bet, previous_grid).await;
        guard.disarm();
        report
    }

    async fn resolve_spin(self: &Arc<Self>, bet: Lamports, previous_grid: Grid) -> SpinReport {
        let min_elapsed = tokio::time::sleep(self.config.min_spin_duration());
        tokio::pin!(min_elapsed);

        // The wallet may have changed since start_spin
        let wallet = *self.wallet.borrow();
        if let Err(e) = self.check_preconditions(wallet, bet) {
            return self.fail(previous_grid, SpinFailure::Precondition(e));
        }

        info!("Spin started");
        let ticker = AnimationTicker::start(
            self.sampler.clone(),
            self.child_rng(),
            self.state.clone(),
            self.metrics.clone(),
            self.config.animation_interval(),
        );

        let (outcome, source) = match self.authority {
            Some(ref authority) => match self.call_authority(authority.as_ref(), bet).await {
                Ok(outcome) => (outcome, OutcomeSource::Authority),
                Err(e) => {
                    ticker.stop().await;
                    return self.fail(previous_grid, SpinFailure::Authority(e));
                }
            },
            None => (self.roll_local(), OutcomeSource::LocalFallback),
        };

        self.state.send_modify(|session| session.phase = SpinPhase::Resolving);
        debug!("Outcome {:?} received, resolving", outcome.payline_symbols);

        min_elapsed.as_mut().await;
        ticker.stop().await;

        let reconciliation = self.reconcile(&outcome, bet, source);

        self.state.send_modify(|session| {
            session.grid = reconciliation.grid;
            session.last_payout = reconciliation.payout;
            session.highlighted_rows = reconciliation.highlighted_rows.clone();
            session.last_source = Some(source);
            session.is_spinning = false;
            session.phase = SpinPhase::Idle;
        });
        self.metrics.record_settled(bet, reconciliation.payout);

        info!(
            "Spin settled: payline {:?}, payout {} ({})",
            reconciliation.grid.payline(),
            reconciliation.payout,
            source
        );
        SpinReport::Settled(reconciliation)
    }

    async fn call_authority(&self, authority: &dyn SpinAuthority, bet: Lamports) -> Result<SpinOutcome, AuthorityError> {
        match self.config.response_timeout() {
            Some(limit) => tokio::time::timeout(limit, authority.spin(bet))
                .await
                .map_err(|_| AuthorityError::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => authority.spin(bet).await,
        }
    }

    /// Failure path: restore the pre-spin grid and surface the message
    fn fail(self: &Arc<Self>, previous_grid: Grid, failure: SpinFailure) -> SpinReport {
        warn!("Spin failed: {}", failure);
        if matches!(failure, SpinFailure::Authority(_)) {
            self.metrics.record_authority_failure();
        }

        self.enter_error(previous_grid, failure.to_string());
        SpinReport::Failed(failure)
    }

    fn enter_error(self: &Arc<Self>, previous_grid: Grid, message: String) {
        let mut epoch = 0;
        self.state.send_modify(|session| {
            epoch = self.error_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            session.grid = previous_grid;
            session.is_spinning = false;
            session.phase = SpinPhase::Error;
            session.pending_error = Some(message);
        });
        self.schedule_error_clear(epoch);
    }

    fn schedule_error_clear(self: &Arc<Self>, epoch: u64) {
        // Cleanup can run while the runtime is shutting down
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let inner = self.clone();
        let delay = self.config.error_display();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.state.send_if_modified(|session| {
                if inner.error_epoch.load(Ordering::SeqCst) != epoch || session.pending_error.is_none() {
                    return false;
                }
                session.pending_error = None;
                if session.phase == SpinPhase::Error {
                    session.phase = SpinPhase::Idle;
                }
                debug!("Error cleared");
                true
            });
        });
    }
}

/// Puts the session back into a usable state if a spin task unwinds
/// before settling or failing.
struct SpinGuard {
    inner: Arc<Inner>,
    previous_grid: Grid,
    armed: bool,
}

impl SpinGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SpinGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Spin task ended before settling");
        self.inner.metrics.record_authority_failure();
        self.inner.enter_error(self.previous_grid, SPIN_INTERRUPTED.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(wallet: WalletStatus) -> SpinMachine {
        SpinMachine::builder(SlotsConfig::testing())
            .wallet(wallet)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_connected_is_rejected() {
        let machine = machine(WalletStatus::disconnected());

        let err = machine.start_spin(Lamports::from_sol(0.01)).err();
        assert_eq!(err, Some(PreconditionError::NotConnected));

        let session = machine.snapshot();
        assert_eq!(session.phase, SpinPhase::Idle);
        assert!(!session.is_spinning);
        assert_eq!(session.pending_error.as_deref(), Some("Please connect your wallet first"));
        assert_eq!(machine.metrics().snapshot().precondition_rejections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_bet_is_rejected() {
        let machine = machine(WalletStatus::connected(Lamports::from_sol(5.0)));
        let err = machine.start_spin(Lamports::from_sol(0.02)).err();
        assert_eq!(err, Some(PreconditionError::UnsupportedBet(Lamports::from_sol(0.02))));
        assert_eq!(machine.snapshot().spin_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_mode_settles_with_local_payout() {
        let machine = machine(WalletStatus::connected(Lamports::from_sol(1.0)));
        assert!(machine.is_local_mode());
        let bet = Lamports::from_sol(0.1);

        let report = machine.start_spin(bet).unwrap().wait().await.unwrap();
        let reconciliation = report.reconciliation().cloned().unwrap();
        assert_eq!(reconciliation.source, OutcomeSource::LocalFallback);

        let [a, b, c] = reconciliation.grid.payline();
        let expected = if a == b && b == c {
            machine.symbol_table().by_identity(a).unwrap().payout_multiplier.apply(bet)
        } else {
            Lamports::ZERO
        };
        assert_eq!(reconciliation.payout, expected);

        let session = machine.snapshot();
        assert_eq!(session.last_source, Some(OutcomeSource::LocalFallback));
        assert_eq!(session.phase, SpinPhase::Idle);
        assert_eq!(session.grid, reconciliation.grid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_disconnect_after_start_fails_defensively() {
        let machine = machine(WalletStatus::connected(Lamports::from_sol(1.0)));
        let before = machine.snapshot().grid;

        let handle = machine.start_spin(Lamports::from_sol(0.01)).unwrap();
        machine.update_wallet(WalletStatus::disconnected());

        let report = handle.wait().await.unwrap();
        assert_eq!(
            report,
            SpinReport::Failed(SpinFailure::Precondition(PreconditionError::NotConnected))
        );

        let session = machine.snapshot();
        assert_eq!(session.phase, SpinPhase::Error);
        assert_eq!(session.grid, before);
        assert!(!session.is_spinning);
    }
}
