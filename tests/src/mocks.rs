//! Mock implementations for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use payment_gateway::{
    FundLock, GatewayError, LockRequest, PaymentGateway, Refund, RefundRequest, SettleRequest,
    Settlement,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Escrow gateway that records every call in memory.
///
/// Implements the same `PaymentGateway` trait as `FinternetClient`, so the
/// engine and router run their production paths against it.
#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    lock_count: AtomicUsize,
    locks: Mutex<Vec<LockRequest>>,
    settlements: Mutex<Vec<SettleRequest>>,
    refunds: Mutex<Vec<RefundRequest>>,
    fail_lock: Mutex<Option<GatewayError>>,
    fail_settle: Mutex<Option<GatewayError>>,
    fail_refund: Mutex<Option<GatewayError>>,
    settle_delay: Mutex<Option<Duration>>,
    lock_delay: Mutex<Option<Duration>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock requests received so far.
    pub fn locks(&self) -> Vec<LockRequest> {
        self.inner.locks.lock().clone()
    }

    pub fn settlements(&self) -> Vec<SettleRequest> {
        self.inner.settlements.lock().clone()
    }

    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.inner.refunds.lock().clone()
    }

    /// Settlement and refund calls combined.
    pub fn release_count(&self) -> usize {
        self.inner.settlements.lock().len() + self.inner.refunds.lock().len()
    }

    pub fn set_lock_failure(&self, err: Option<GatewayError>) {
        *self.inner.fail_lock.lock() = err;
    }

    pub fn set_settle_failure(&self, err: Option<GatewayError>) {
        *self.inner.fail_settle.lock() = err;
    }

    pub fn set_refund_failure(&self, err: Option<GatewayError>) {
        *self.inner.fail_refund.lock() = err;
    }

    /// Holds every settlement for `delay` before answering.
    pub fn set_settle_delay(&self, delay: Option<Duration>) {
        *self.inner.settle_delay.lock() = delay;
    }

    /// Holds every fund lock for `delay` before answering.
    pub fn set_lock_delay(&self, delay: Option<Duration>) {
        *self.inner.lock_delay.lock() = delay;
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn lock_funds(&self, request: LockRequest) -> Result<FundLock, GatewayError> {
        let delay = *self.inner.lock_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.inner.fail_lock.lock().clone() {
            return Err(err);
        }
        let n = self.inner.lock_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.locks.lock().push(request);
        Ok(FundLock {
            lock_reference: format!("intent_{:04}", n),
            status: Some("INITIATED".to_string()),
        })
    }

    async fn settle(&self, request: SettleRequest) -> Result<Settlement, GatewayError> {
        let delay = *self.inner.settle_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let n = {
            let mut settlements = self.inner.settlements.lock();
            settlements.push(request);
            settlements.len()
        };
        if let Some(err) = self.inner.fail_settle.lock().clone() {
            return Err(err);
        }
        Ok(Settlement {
            settlement_id: Some(format!("tx_{:04}", n)),
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<Refund, GatewayError> {
        let n = {
            let mut refunds = self.inner.refunds.lock();
            refunds.push(request);
            refunds.len()
        };
        if let Some(err) = self.inner.fail_refund.lock().clone() {
            return Err(err);
        }
        Ok(Refund {
            refund_id: Some(format!("rf_{:04}", n)),
        })
    }

    async fn balance(&self) -> Result<Value, GatewayError> {
        Ok(json!({ "data": { "available": "250.00", "currency": "USDC" } }))
    }

    async fn escrow(&self, lock_reference: &str) -> Result<Value, GatewayError> {
        Ok(json!({ "data": { "paymentIntentId": lock_reference, "status": "HELD" } }))
    }

    async fn ledger_entries(&self, limit: u32, offset: u32) -> Result<Value, GatewayError> {
        Ok(json!({ "data": [], "limit": limit, "offset": offset }))
    }
}

/// Sum of settled amounts, for asserting the exact amount charged.
pub fn settled_total(gateway: &MockGateway) -> Decimal {
    gateway.settlements().iter().map(|s| s.amount).sum()
}
