//! In-process billing metrics.
//!
//! Counters and gauges are plain atomics behind a global registry, exposed
//! as a JSON snapshot on `/metrics`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Gauge that can go up or down. Never drops below zero.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; Histogram::BUCKETS],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKETS: usize = 10;
    /// Upper bounds; anything slower lands in the last bucket.
    const BUCKET_BOUNDS: [u64; Histogram::BUCKETS] =
        [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKETS - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            count => self.sum() as f64 / count as f64,
        }
    }

    /// `(upper_bound_ms, count)` pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Billing engine metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    // Lifecycle
    pub sessions_started: Counter,
    pub sessions_completed: Counter,
    pub sessions_cancelled: Counter,
    pub terminal_conflicts: Counter,
    pub sessions_evicted: Counter,

    // Money movement
    pub fund_lock_failures: Counter,
    pub settlements_degraded: Counter,
    pub refunds_degraded: Counter,
    pub compensating_refunds: Counter,

    // Gateway
    pub gateway_errors: Counter,
    pub gateway_latency_ms: Histogram,

    // Gauges
    pub active_sessions: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            sessions_started: self.sessions_started.get(),
            sessions_completed: self.sessions_completed.get(),
            sessions_cancelled: self.sessions_cancelled.get(),
            terminal_conflicts: self.terminal_conflicts.get(),
            sessions_evicted: self.sessions_evicted.get(),
            fund_lock_failures: self.fund_lock_failures.get(),
            settlements_degraded: self.settlements_degraded.get(),
            refunds_degraded: self.refunds_degraded.get(),
            compensating_refunds: self.compensating_refunds.get(),
            gateway_errors: self.gateway_errors.get(),
            gateway_requests: self.gateway_latency_ms.count(),
            gateway_latency_mean_ms: self.gateway_latency_ms.mean(),
            active_sessions: self.active_sessions.get(),
        }
    }
}

/// Point-in-time copy of the metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_cancelled: u64,
    pub terminal_conflicts: u64,
    pub sessions_evicted: u64,
    pub fund_lock_failures: u64,
    pub settlements_degraded: u64,
    pub refunds_degraded: u64,
    pub compensating_refunds: u64,
    pub gateway_errors: u64,
    pub gateway_requests: u64,
    pub gateway_latency_mean_ms: f64,
    pub active_sessions: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
