//! Animation ticker
//!
//! Re-samples the whole grid on a fixed interval while a spin is in flight.
//! The ticker owns its task; `stop` cancels it and waits for it to finish,
//! and dropping the ticker without `stop` still aborts the task.

use crate::games::sampler::WeightedSampler;
use crate::metrics::SpinMetrics;
use crate::session::SpinSession;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct AnimationTicker {
    handle: Option<JoinHandle<()>>,
}

impl AnimationTicker {
    /// Start ticking. The first frame lands one `interval` after start.
    pub fn start(
        sampler: Arc<WeightedSampler>,
        mut rng: StdRng,
        state: Arc<watch::Sender<SpinSession>>,
        metrics: Arc<SpinMetrics>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval() fires immediately on the first tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let grid = sampler.sample_grid(&mut rng);
                state.send_modify(|session| session.grid = grid);
                metrics.record_animation_frame();
            }
        });

        debug!("Animation started ({}ms interval)", interval.as_millis());
        Self { handle: Some(handle) }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Cancel the ticker; no frame is published after this returns
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            debug!("Animation stopped");
        }
    }
}

impl Drop for AnimationTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
