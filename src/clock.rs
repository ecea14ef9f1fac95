//! # Poll Lifecycle Clock
//!
//! Recurring scan that drives the open -> closed transition at expiry and
//! publishes the closing snapshot (winners attached) to each poll's room.
//!
//! The transition itself is idempotent and serialized against vote admission
//! by the store's per-poll lock; the clock only decides when to look.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::info;

use crate::poll::TallyStore;
use crate::realtime::BroadcastHub;

/// Clock configuration
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Seconds between expiry scans
    pub tick_interval_secs: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
        }
    }
}

/// Periodic expiry driver
pub struct LifecycleClock {
    store: Arc<TallyStore>,
    hub: Arc<BroadcastHub>,
    config: ClockConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl LifecycleClock {
    /// Create a clock over the given store and hub
    pub fn new(store: Arc<TallyStore>, hub: Arc<BroadcastHub>, config: ClockConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            hub,
            config,
            shutdown_tx,
        }
    }

    /// Run the tick loop until shutdown is signalled
    pub async fn run(&self) {
        let interval = tokio::time::Duration::from_secs(self.config.tick_interval_secs);
        let mut ticker = tokio::time::interval(interval);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(
            tick_interval_secs = self.config.tick_interval_secs,
            "lifecycle clock started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("lifecycle clock shutting down");
                    break;
                }
            }
        }
    }

    /// One expiry scan.
    ///
    /// Each newly closed poll's closing snapshot is published while that
    /// poll's lock is still held, so it is the last snapshot any room member
    /// receives for that poll.
    pub async fn tick(&self, now: DateTime<Utc>) -> usize {
        let hub = Arc::clone(&self.hub);
        let closed = self
            .store
            .close_expired(now, |snapshot| {
                hub.publish(snapshot);
            })
            .await;
        closed.len()
    }

    /// Signal the run loop to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
