//! Background reclamation of expired rate limit entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace};

use crate::clock::Clock;
use crate::rate_limiter::RateLimiter;

/// Owns the sweep task. Dropping the handle aborts the task.
pub struct SweepHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Run [`RateLimiter::sweep`] every `period` until the handle is shut down.
pub fn spawn_sweeper<C: Clock>(limiter: Arc<RateLimiter<C>>, period: Duration) -> SweepHandle {
    let (tx, mut rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = ticker.tick() => {
                    let removed = limiter.sweep();
                    trace!(removed, tracked = limiter.len(), "Rate limit sweep finished");
                }
            }
        }

        info!("Rate limit sweeper stopped");
    });

    info!(period_secs = period.as_secs(), "Rate limit sweeper started");

    SweepHandle {
        shutdown: Some(tx),
        task: Some(task),
    }
}

impl SweepHandle {
    /// Signal the task to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
