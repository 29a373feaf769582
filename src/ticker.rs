//! Periodic tick scheduler
//!
//! Calls [`TimerStore::tick`](crate::storage::TimerStore::tick) once per
//! period. The first tick fires one period after start. Missed ticks are
//! skipped rather than replayed, and a tick is awaited before the next one is
//! considered, so ticks never overlap.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::metrics;
use crate::storage::SharedTimerStore;

/// Drives the store's tick at a fixed period
pub struct TickScheduler {
    store: SharedTimerStore,
    period: Duration,
}

impl TickScheduler {
    pub fn new(store: SharedTimerStore, period: Duration) -> Self {
        Self { store, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run a single tick, recording metrics
    pub async fn tick_once(&self) -> Result<usize> {
        tick_store(&self.store).await
    }

    /// Spawn the tick loop
    pub fn start(self) -> TickerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let store = self.store;
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(period_ms = period.as_millis() as u64, "Tick scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Errors are already logged and counted
                        let _ = tick_store(&store).await;
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Tick scheduler shutting down");
                        break;
                    }
                }
            }
        });

        TickerHandle { handle, shutdown }
    }
}

async fn tick_store(store: &SharedTimerStore) -> Result<usize> {
    let _timer = metrics::start_tick_timer();

    match store.tick().await {
        Ok(advanced) => {
            metrics::record_tick(advanced);
            tracing::trace!(advanced, "Tick applied");
            Ok(advanced)
        }
        Err(e) => {
            metrics::record_tick_failure();
            tracing::warn!(error = %e, "Tick failed");
            Err(e)
        }
    }
}

/// Handle to the running tick loop
pub struct TickerHandle {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl TickerHandle {
    /// Signal shutdown and wait for the loop to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Tick scheduler task failed");
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
