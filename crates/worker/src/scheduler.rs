//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;

use billing_core::Clock;
use payment_gateway::PaymentGateway;
use serde::{Deserialize, Serialize};
use session_store::SessionStore;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::eviction::EvictionWorker;
use crate::health_probe::probe_dependencies;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How often finished sessions are swept
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
    /// How often gateway and store health is re-checked
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

fn default_eviction_interval_secs() -> u64 {
    300
}

fn default_health_check_interval_secs() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            eviction_interval_secs: default_eviction_interval_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    /// Retention for finished sessions
    retention: chrono::Duration,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn SessionStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            clock,
            retention,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_eviction_worker().await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_probe().await;
        }));

        info!(
            eviction_interval_secs = self.config.eviction_interval_secs,
            health_check_interval_secs = self.config.health_check_interval_secs,
            "Background workers started"
        );
        handles
    }

    async fn run_eviction_worker(&self) {
        let worker = EvictionWorker::new(self.store.clone(), self.clock.clone(), self.retention);
        let mut ticker = interval(Duration::from_secs(self.config.eviction_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Eviction worker error: {}", e);
            }
        }
    }

    async fn run_health_probe(&self) {
        let mut ticker =
            interval(Duration::from_secs(self.config.health_check_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            probe_dependencies(self.gateway.as_ref(), self.store.as_ref()).await;
        }
    }
}
