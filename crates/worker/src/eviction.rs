//! Eviction of finished sessions.
//!
//! Completed and cancelled records are kept for a retention window so
//! feedback can still be attached after the session ends. Redis expires
//! them by key TTL; this sweep covers the in-memory store and the Redis
//! terminal index.

use std::sync::Arc;

use billing_core::Clock;
use chrono::Duration;
use session_store::SessionStore;
use telemetry::metrics;
use tracing::{debug, info};

pub struct EvictionWorker {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl EvictionWorker {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    /// Removes terminal sessions older than the retention window.
    pub async fn run(&self) -> Result<usize, String> {
        let cutoff = self.clock.now() - self.retention;

        let evicted = self
            .store
            .purge_terminal(cutoff)
            .await
            .map_err(|e| format!("Failed to purge terminal sessions: {}", e))?;

        if evicted > 0 {
            metrics().sessions_evicted.inc_by(evicted as u64);
            info!(evicted, cutoff = %cutoff, "Evicted finished sessions");
        } else {
            debug!(cutoff = %cutoff, "No finished sessions to evict");
        }

        Ok(evicted)
    }
}
