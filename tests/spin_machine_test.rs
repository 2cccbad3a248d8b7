//! State machine behaviour under paused Tokio time

use async_trait::async_trait;
use gorbagana_slots::{
    AuthorityError, Lamports, OutcomeSource, PreconditionError, SlotsConfig, SpinAuthority, SpinFailure,
    SpinMachine, SpinOutcome, SpinPhase, SpinReport, WalletStatus, LAMPORTS_PER_SOL, SPIN_INTERRUPTED,
};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Authority that replays a fixed script of results after a delay
struct ScriptedAuthority {
    script: Mutex<VecDeque<Result<SpinOutcome, AuthorityError>>>,
    latency: Duration,
    calls: AtomicU64,
}

impl ScriptedAuthority {
    fn new(latency_ms: u64, script: Vec<Result<SpinOutcome, AuthorityError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            latency: Duration::from_millis(latency_ms),
            calls: AtomicU64::new(0),
        })
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpinAuthority for ScriptedAuthority {
    async fn spin(&self, _bet: Lamports) -> Result<SpinOutcome, AuthorityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.latency).await;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AuthorityError::Transport("script exhausted".to_string())))
    }
}

/// Authority whose call panics mid-flight
struct PanickingAuthority;

#[async_trait]
impl SpinAuthority for PanickingAuthority {
    async fn spin(&self, _bet: Lamports) -> Result<SpinOutcome, AuthorityError> {
        sleep(Duration::from_millis(100)).await;
        panic!("authority adapter crashed");
    }
}

fn outcome(symbols: [u8; 3], payout: Lamports) -> Result<SpinOutcome, AuthorityError> {
    Ok(SpinOutcome {
        payline_symbols: symbols,
        payout,
    })
}

fn bet() -> Lamports {
    Lamports::from_sol(0.01)
}

fn rich_wallet() -> WalletStatus {
    WalletStatus::connected(Lamports::from_sol(10.0))
}

fn machine_with(config: SlotsConfig, authority: Arc<ScriptedAuthority>) -> SpinMachine {
    SpinMachine::builder(config)
        .authority(authority)
        .wallet(rich_wallet())
        .build()
        .unwrap()
}

fn machine(authority: Arc<ScriptedAuthority>) -> SpinMachine {
    machine_with(SlotsConfig::testing(), authority)
}

#[tokio::test(start_paused = true)]
async fn test_winning_outcome_is_displayed() {
    let authority = ScriptedAuthority::new(200, vec![outcome([0, 0, 0], Lamports(LAMPORTS_PER_SOL))]);
    let machine = machine(authority.clone());

    let report = machine.start_spin(bet()).unwrap().wait().await.unwrap();
    assert!(report.is_settled());

    let session = machine.snapshot();
    assert_eq!(session.grid.payline(), [0, 0, 0]);
    assert_eq!(session.last_payout.as_sol(), 1.0);
    assert_eq!(session.highlighted_rows, BTreeSet::from([1]));
    assert_eq!(session.last_source, Some(OutcomeSource::Authority));
    assert_eq!(session.phase, SpinPhase::Idle);
    assert!(!session.is_spinning);
    assert!(session.pending_error.is_none());
    assert_eq!(authority.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_losing_outcome_has_no_highlight() {
    let authority = ScriptedAuthority::new(200, vec![outcome([0, 1, 2], Lamports::ZERO)]);
    let machine = machine(authority);

    machine.start_spin(bet()).unwrap().wait().await.unwrap();

    let session = machine.snapshot();
    assert_eq!(session.grid.payline(), [0, 1, 2]);
    assert_eq!(session.last_payout, Lamports::ZERO);
    assert!(session.highlighted_rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_authority_rejection_restores_grid_and_clears_error() {
    let authority = ScriptedAuthority::new(
        200,
        vec![Err(AuthorityError::InsufficientFunds {
            balance: Lamports::ZERO,
            required: bet(),
        })],
    );
    let machine = machine(authority);
    let before = machine.snapshot().grid;

    let report = machine.start_spin(bet()).unwrap().wait().await.unwrap();
    assert!(matches!(
        report,
        SpinReport::Failed(SpinFailure::Authority(AuthorityError::InsufficientFunds { .. }))
    ));

    let session = machine.snapshot();
    assert!(!session.is_spinning);
    assert_eq!(session.phase, SpinPhase::Error);
    assert_eq!(session.grid, before);
    assert_eq!(session.last_payout, Lamports::ZERO);
    assert!(session.pending_error.as_deref().unwrap().contains("Insufficient funds"));

    // No further mutation once the failure has been handled
    let mut rx = machine.subscribe();
    let _ = rx.borrow_and_update();
    sleep(Duration::from_millis(1000)).await;
    assert!(!rx.has_changed().unwrap());

    sleep(Duration::from_millis(3900)).await;
    assert!(machine.snapshot().pending_error.is_some());

    sleep(Duration::from_millis(200)).await;
    let session = machine.snapshot();
    assert!(session.pending_error.is_none());
    assert_eq!(session.phase, SpinPhase::Idle);
    assert_eq!(session.grid, before);
    assert_eq!(machine.metrics().snapshot().authority_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_while_spinning_is_a_no_op() {
    let authority = ScriptedAuthority::new(1000, vec![outcome([3, 3, 3], Lamports(1))]);
    let machine = machine(authority.clone());

    let handle = machine.start_spin(bet()).unwrap();
    sleep(Duration::from_millis(250)).await;

    let before = machine.snapshot();
    assert!(before.is_spinning);
    let second = machine.start_spin(bet());
    assert!(matches!(second, Err(PreconditionError::AlreadySpinning)));
    assert_eq!(machine.snapshot(), before);
    assert!(before.pending_error.is_none());

    handle.wait().await.unwrap();
    assert_eq!(authority.calls(), 1);
    assert_eq!(machine.snapshot().spin_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fast_authority_waits_for_minimum_duration() {
    let authority = ScriptedAuthority::new(0, vec![outcome([5, 5, 5], Lamports(100))]);
    let machine = machine(authority);

    let started = Instant::now();
    machine.start_spin(bet()).unwrap().wait().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(1500), "settled after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1600), "settled after {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_slow_authority_sets_the_pace() {
    let authority = ScriptedAuthority::new(3000, vec![outcome([6, 1, 6], Lamports::ZERO)]);
    let machine = machine(authority);

    let started = Instant::now();
    machine.start_spin(bet()).unwrap().wait().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(3000));
    assert!(elapsed < Duration::from_millis(3100));
}

#[tokio::test(start_paused = true)]
async fn test_phases_during_spin() {
    let authority = ScriptedAuthority::new(300, vec![outcome([2, 2, 2], Lamports(5))]);
    let machine = machine(authority);

    let handle = machine.start_spin(bet()).unwrap();
    assert_eq!(machine.snapshot().phase, SpinPhase::Animating);

    sleep(Duration::from_millis(150)).await;
    assert_eq!(machine.snapshot().phase, SpinPhase::Animating);

    sleep(Duration::from_millis(350)).await;
    let session = machine.snapshot();
    assert_eq!(session.phase, SpinPhase::Resolving);
    assert!(session.is_spinning);

    handle.wait().await.unwrap();
    assert_eq!(machine.snapshot().phase, SpinPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_grid_animates_while_spinning() {
    let authority = ScriptedAuthority::new(0, vec![outcome([4, 4, 1], Lamports::ZERO)]);
    let machine = machine(authority);
    let mut rx = machine.subscribe();

    let handle = machine.start_spin(bet()).unwrap();
    let _ = rx.borrow_and_update();

    let mut grids = std::collections::HashSet::new();
    for _ in 0..10 {
        sleep(Duration::from_millis(100)).await;
        if rx.has_changed().unwrap() {
            grids.insert(rx.borrow_and_update().grid);
        }
    }
    assert!(grids.len() > 1, "animation should produce distinct frames");

    handle.wait().await.unwrap();
    let frames = machine.metrics().animation_frames();
    assert!((14..=15).contains(&frames), "unexpected frame count {}", frames);
}

#[tokio::test(start_paused = true)]
async fn test_response_timeout_fails_the_spin() {
    let mut config = SlotsConfig::testing();
    config.authority.response_timeout_ms = Some(1000);
    let authority = ScriptedAuthority::new(5000, vec![outcome([0, 0, 0], Lamports(1))]);
    let machine = machine_with(config, authority);

    let started = Instant::now();
    let report = machine.start_spin(bet()).unwrap().wait().await.unwrap();

    assert_eq!(
        report,
        SpinReport::Failed(SpinFailure::Authority(AuthorityError::Timeout { timeout_ms: 1000 }))
    );
    assert!(started.elapsed() < Duration::from_millis(1100));
    assert_eq!(machine.snapshot().phase, SpinPhase::Error);
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_balance_is_rejected_locally() {
    let authority = ScriptedAuthority::new(0, vec![]);
    let machine = SpinMachine::builder(SlotsConfig::testing())
        .authority(authority.clone())
        .wallet(WalletStatus::connected(Lamports::from_sol(0.001)))
        .build()
        .unwrap();

    let err = machine.start_spin(bet()).err();
    assert!(matches!(err, Some(PreconditionError::InsufficientBalance { .. })));

    let session = machine.snapshot();
    assert_eq!(session.pending_error.as_deref(), Some("Insufficient balance"));
    assert_eq!(session.phase, SpinPhase::Idle);
    assert!(!session.is_spinning);

    sleep(Duration::from_millis(5001)).await;
    assert!(machine.snapshot().pending_error.is_none());
    assert_eq!(authority.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_newer_error_outlives_older_clear_timer() {
    let authority = ScriptedAuthority::new(0, vec![]);
    let machine = SpinMachine::builder(SlotsConfig::testing())
        .authority(authority)
        .wallet(WalletStatus::disconnected())
        .build()
        .unwrap();

    assert!(machine.start_spin(bet()).is_err());
    sleep(Duration::from_millis(3000)).await;

    machine.update_wallet(WalletStatus::connected(Lamports(1)));
    assert!(machine.start_spin(bet()).is_err());
    assert_eq!(machine.snapshot().pending_error.as_deref(), Some("Insufficient balance"));

    // First timer fires at 5000 but must not clear the newer message
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(machine.snapshot().pending_error.as_deref(), Some("Insufficient balance"));

    sleep(Duration::from_millis(2600)).await;
    assert!(machine.snapshot().pending_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rejection_at_clear_deadline_is_kept() {
    let machine = SpinMachine::builder(SlotsConfig::testing())
        .wallet(WalletStatus::disconnected())
        .build()
        .unwrap();

    assert!(machine.start_spin(bet()).is_err());
    // Lands on the same instant the first clear timer fires
    sleep(Duration::from_millis(5000)).await;
    machine.update_wallet(WalletStatus::connected(Lamports(1)));
    assert!(machine.start_spin(bet()).is_err());

    tokio::task::yield_now().await;
    assert_eq!(machine.snapshot().pending_error.as_deref(), Some("Insufficient balance"));

    sleep(Duration::from_millis(5001)).await;
    assert!(machine.snapshot().pending_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_panicking_authority_does_not_wedge_the_machine() {
    let machine = SpinMachine::builder(SlotsConfig::testing())
        .authority(Arc::new(PanickingAuthority))
        .wallet(rich_wallet())
        .build()
        .unwrap();
    let before = machine.snapshot().grid;

    let joined = machine.start_spin(bet()).unwrap().wait().await;
    assert!(joined.unwrap_err().is_panic());

    let session = machine.snapshot();
    assert!(!session.is_spinning);
    assert_eq!(session.phase, SpinPhase::Error);
    assert_eq!(session.grid, before);
    assert_eq!(session.pending_error.as_deref(), Some(SPIN_INTERRUPTED));

    sleep(Duration::from_millis(5001)).await;
    let session = machine.snapshot();
    assert_eq!(session.phase, SpinPhase::Idle);
    assert!(session.pending_error.is_none());

    // The next spin is accepted rather than reported as already spinning
    let handle = machine.start_spin(bet()).unwrap();
    assert_eq!(machine.snapshot().phase, SpinPhase::Animating);
    assert!(handle.wait().await.unwrap_err().is_panic());
}

#[tokio::test(start_paused = true)]
async fn test_new_spin_from_error_clears_message() {
    let authority = ScriptedAuthority::new(
        100,
        vec![
            Err(AuthorityError::Transport("connection reset".to_string())),
            outcome([7, 7, 7], Lamports::from_sol(0.02)),
        ],
    );
    let machine = machine(authority);

    let first = machine.start_spin(bet()).unwrap().wait().await.unwrap();
    assert!(!first.is_settled());
    assert_eq!(machine.snapshot().phase, SpinPhase::Error);

    let handle = machine.start_spin(bet()).unwrap();
    let session = machine.snapshot();
    assert_eq!(session.phase, SpinPhase::Animating);
    assert!(session.pending_error.is_none());

    let report = handle.wait().await.unwrap();
    assert_eq!(report.reconciliation().unwrap().payout, Lamports::from_sol(0.02));

    // The first failure's clear timer must not disturb the settled state
    sleep(Duration::from_millis(6000)).await;
    let session = machine.snapshot();
    assert_eq!(session.phase, SpinPhase::Idle);
    assert_eq!(session.last_payout, Lamports::from_sol(0.02));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_symbol_falls_back_to_default() {
    let authority = ScriptedAuthority::new(0, vec![outcome([1, 42, 1], Lamports::ZERO)]);
    let machine = machine(authority);

    let report = machine.start_spin(bet()).unwrap().wait().await.unwrap();
    assert_eq!(report.reconciliation().unwrap().grid.payline(), [1, 7, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_local_mode_is_flagged() {
    let machine = SpinMachine::builder(SlotsConfig::testing())
        .wallet(rich_wallet())
        .seed(7)
        .build()
        .unwrap();
    assert!(machine.is_local_mode());

    for _ in 0..5 {
        let report = machine.start_spin(bet()).unwrap().wait().await.unwrap();
        assert_eq!(report.reconciliation().unwrap().source, OutcomeSource::LocalFallback);
    }

    let metrics = machine.metrics().snapshot();
    assert_eq!(metrics.spins_started, 5);
    assert_eq!(metrics.spins_settled, 5);
    assert_eq!(metrics.lamports_wagered, Lamports(bet().get() * 5));
}
