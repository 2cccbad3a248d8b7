//! Spin counters

use crate::common::types::Lamports;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SpinMetrics {
    spins_started: AtomicU64,
    spins_settled: AtomicU64,
    wins: AtomicU64,
    authority_failures: AtomicU64,
    precondition_rejections: AtomicU64,
    animation_frames: AtomicU64,
    lamports_wagered: AtomicU64,
    lamports_paid: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub spins_started: u64,
    pub spins_settled: u64,
    pub wins: u64,
    pub authority_failures: u64,
    pub precondition_rejections: u64,
    pub animation_frames: u64,
    pub lamports_wagered: Lamports,
    pub lamports_paid: Lamports,
}

impl MetricsSnapshot {
    /// Paid over wagered; zero before any settled spin
    pub fn return_to_player(&self) -> f64 {
        if self.lamports_wagered.is_zero() {
            return 0.0;
        }
        self.lamports_paid.get() as f64 / self.lamports_wagered.get() as f64
    }
}

impl SpinMetrics {
    pub fn new() -> Self {
        Self {
            spins_started: AtomicU64::new(0),
            spins_settled: AtomicU64::new(0),
            wins: AtomicU64::new(0),
            authority_failures: AtomicU64::new(0),
            precondition_rejections: AtomicU64::new(0),
            animation_frames: AtomicU64::new(0),
            lamports_wagered: AtomicU64::new(0),
            lamports_paid: AtomicU64::new(0),
        }
    }

    pub fn record_spin_started(&self) {
        self.spins_started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_settled(&self, bet: Lamports, payout: Lamports) {
        self.spins_settled.fetch_add(1, Ordering::SeqCst);
        self.lamports_wagered.fetch_add(bet.get(), Ordering::SeqCst);
        if !payout.is_zero() {
            self.wins.fetch_add(1, Ordering::SeqCst);
            self.lamports_paid.fetch_add(payout.get(), Ordering::SeqCst);
        }
    }

    pub fn record_authority_failure(&self) {
        self.authority_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_precondition_rejection(&self) {
        self.precondition_rejections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_animation_frame(&self) {
        self.animation_frames.fetch_add(1, Ordering::SeqCst);
    }

    pub fn animation_frames(&self) -> u64 {
        self.animation_frames.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            spins_started: self.spins_started.load(Ordering::SeqCst),
            spins_settled: self.spins_settled.load(Ordering::SeqCst),
            wins: self.wins.load(Ordering::SeqCst),
            authority_failures: self.authority_failures.load(Ordering::SeqCst),
            precondition_rejections: self.precondition_rejections.load(Ordering::SeqCst),
            animation_frames: self.animation_frames.load(Ordering::SeqCst),
            lamports_wagered: Lamports(self.lamports_wagered.load(Ordering::SeqCst)),
            lamports_paid: Lamports(self.lamports_paid.load(Ordering::SeqCst)),
        }
    }
}

impl Default for SpinMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_counters() {
        let metrics = SpinMetrics::new();
        metrics.record_spin_started();
        metrics.record_settled(Lamports(100), Lamports::ZERO);
        metrics.record_spin_started();
        metrics.record_settled(Lamports(100), Lamports(500));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.spins_started, 2);
        assert_eq!(snapshot.spins_settled, 2);
        assert_eq!(snapshot.wins, 1);
        assert_eq!(snapshot.lamports_wagered, Lamports(200));
        assert_eq!(snapshot.lamports_paid, Lamports(500));
        assert_eq!(snapshot.return_to_player(), 2.5);
    }

    #[test]
    fn test_empty_rtp_is_zero() {
        assert_eq!(SpinMetrics::new().snapshot().return_to_player(), 0.0);
    }
}
