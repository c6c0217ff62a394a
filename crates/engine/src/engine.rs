//! The billing session engine.
//!
//! Terminal transitions are committed to the store before the gateway is
//! called. Only the caller whose compare-and-swap wins talks to the
//! gateway, so a session is settled or refunded at most once. A gateway
//! failure after that point yields a degraded receipt on the summary; the
//! session stays terminal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use billing_core::{
    Clock, Error, Feedback, GatewayReceipt, QuizScore, ReceiptKind, Result, SessionId,
    SessionPatch, SessionRecord, SessionSnapshot, SessionSummary,
};
use payment_gateway::{
    DeliveryProof, GatewayError, LockRequest, PaymentGateway, RefundRequest, SettleRequest,
};
use serde_json::Value;
use session_store::{CloseOutcome, SessionStore};
use std::collections::BTreeMap;
use telemetry::metrics;
use tracing::{error, info, instrument, warn};

use crate::config::BillingConfig;
use crate::request::{cancel_reason, StartSession};

/// Largest ledger page the engine will request.
pub const MAX_LEDGER_PAGE: u32 = 100;

/// Refund reason used when a lock has to be rolled back.
const COMPENSATION_REASON: &str = "session_store_failure";

pub struct SessionEngine {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: BillingConfig,
}

impl SessionEngine {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: BillingConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            clock,
            config,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Locks funds and opens an active session.
    ///
    /// No record exists unless the lock succeeded, and no lock survives a
    /// failed record write.
    #[instrument(skip_all, fields(resource = %request.resource.id, payer = %request.payer))]
    pub async fn start(&self, request: StartSession) -> Result<SessionRecord> {
        request.validate()?;
        let terms = request.resolve_terms(&self.config)?;
        let session_id = SessionId::generate();

        let lock_request = LockRequest {
            amount: terms.locked_amount,
            payer: request.payer.clone(),
            reference: session_id.to_string(),
            description: request.description(),
            metadata: BTreeMap::from([
                ("resourceKind".to_string(), request.resource.kind.as_str().to_string()),
                ("resourceId".to_string(), request.resource.id.clone()),
            ]),
        };

        let lock = match self.call(self.gateway.lock_funds(lock_request)).await {
            Ok(lock) => lock,
            Err(e) => {
                metrics().fund_lock_failures.inc();
                warn!(session_id = %session_id, error = %e, "Fund lock failed");
                return Err(Error::lock_failed(session_id.to_string(), e.to_string()));
            }
        };

        let record = SessionRecord::open(
            session_id.clone(),
            request.resource,
            request.payer,
            lock.lock_reference,
            terms,
            self.clock.now(),
        );

        if let Err(e) = self.store.put(record.clone()).await {
            error!(session_id = %session_id, error = %e, "Failed to persist session, refunding lock");
            self.compensate(&record).await;
            return Err(e);
        }

        metrics().sessions_started.inc();
        metrics().active_sessions.inc();
        info!(
            session_id = %session_id,
            lock_reference = %record.lock_reference,
            locked_amount = %record.locked_amount(),
            rate_per_minute = %record.terms.rate_per_minute,
            "Session started"
        );

        Ok(record)
    }

    /// Live view of a session. Never mutates it.
    pub async fn poll_status(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let record = self.load(session_id).await?;
        Ok(record.snapshot(self.clock.now()))
    }

    /// Full record including side data and gateway receipt.
    pub async fn get(&self, session_id: &SessionId) -> Result<SessionRecord> {
        self.load(session_id).await
    }

    /// Ends an active session, charging for elapsed time up to the lock.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn end(&self, session_id: &SessionId) -> Result<SessionSummary> {
        let record = self.load(session_id).await?;
        self.ensure_active(&record)?;

        let terminal = record.completion(self.clock.now());
        let closed = self.commit(session_id, terminal).await?;
        let Some(closure) = closed.state.closure() else {
            return Err(Error::internal("closed session has no closure"));
        };

        let proof = DeliveryProof::for_session(
            session_id.as_str(),
            &self.config.proof_base_url,
            self.config.payee_address.clone(),
        );
        let settle = SettleRequest {
            lock_reference: closed.lock_reference.clone(),
            amount: closure.amount_charged,
            reference: session_id.to_string(),
            proof,
        };

        let receipt = match self.call(self.gateway.settle(settle)).await {
            Ok(settlement) => GatewayReceipt::confirmed(
                ReceiptKind::Settlement,
                settlement.settlement_id,
                self.clock.now(),
            ),
            Err(e) => {
                metrics().settlements_degraded.inc();
                warn!(
                    lock_reference = %closed.lock_reference,
                    amount = %closure.amount_charged,
                    recoverable = e.is_recoverable(),
                    error = %e,
                    "Settlement not confirmed, session completed in degraded state"
                );
                GatewayReceipt::degraded(
                    ReceiptKind::Settlement,
                    e.to_string(),
                    e.is_recoverable(),
                    self.clock.now(),
                )
            }
        };

        metrics().sessions_completed.inc();
        info!(
            amount_charged = %closure.amount_charged,
            amount_refunded = %closure.amount_refunded,
            confirmed = receipt.confirmed,
            "Session completed"
        );

        self.finish(closed, receipt).await
    }

    /// Cancels an active session and refunds the whole lock.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn cancel(&self, session_id: &SessionId, reason: Option<&str>) -> Result<SessionSummary> {
        let reason = cancel_reason(reason)?;
        let record = self.load(session_id).await?;
        self.ensure_active(&record)?;

        let terminal = record.cancellation(self.clock.now(), reason.clone());
        let closed = self.commit(session_id, terminal).await?;
        let Some(closure) = closed.state.closure() else {
            return Err(Error::internal("closed session has no closure"));
        };

        let refund = RefundRequest {
            lock_reference: closed.lock_reference.clone(),
            amount: closure.amount_refunded,
            reason,
        };

        let receipt = match self.call(self.gateway.refund(refund)).await {
            Ok(refund) => {
                GatewayReceipt::confirmed(ReceiptKind::Refund, refund.refund_id, self.clock.now())
            }
            Err(e) => {
                metrics().refunds_degraded.inc();
                warn!(
                    lock_reference = %closed.lock_reference,
                    amount = %closure.amount_refunded,
                    recoverable = e.is_recoverable(),
                    error = %e,
                    "Refund not confirmed, session cancelled in degraded state"
                );
                GatewayReceipt::degraded(
                    ReceiptKind::Refund,
                    e.to_string(),
                    e.is_recoverable(),
                    self.clock.now(),
                )
            }
        };

        metrics().sessions_cancelled.inc();
        info!(
            amount_refunded = %closure.amount_refunded,
            confirmed = receipt.confirmed,
            "Session cancelled"
        );

        self.finish(closed, receipt).await
    }

    /// Appends a quiz score. Returns its 1-based position in the sequence.
    pub async fn attach_quiz_score(
        &self,
        session_id: &SessionId,
        score: u32,
        total: u32,
        position_secs: u32,
    ) -> Result<usize> {
        let quiz = QuizScore::new(score, total, position_secs, self.clock.now())?;

        // The store enforces the per-session cap inside its atomic update
        let updated = self
            .store
            .update(session_id, SessionPatch::AppendQuizScore(quiz))
            .await?
            .ok_or_else(|| Error::not_found(session_id.as_str()))?;

        Ok(updated.quiz_scores.len())
    }

    /// Sets the session's feedback. Last write wins.
    pub async fn attach_feedback(
        &self,
        session_id: &SessionId,
        stars: u8,
        comment: Option<String>,
    ) -> Result<Feedback> {
        let feedback = Feedback::new(stars, comment, self.clock.now())?;

        self.store
            .update(session_id, SessionPatch::SetFeedback(feedback.clone()))
            .await?
            .ok_or_else(|| Error::not_found(session_id.as_str()))?;

        Ok(feedback)
    }

    /// Merchant balance as reported by the gateway.
    pub async fn balance(&self) -> Result<Value> {
        Ok(self.call(self.gateway.balance()).await?)
    }

    /// Escrow details for a lock.
    pub async fn escrow(&self, lock_reference: &str) -> Result<Value> {
        let lock_reference = lock_reference.trim();
        if lock_reference.is_empty() || lock_reference.contains('/') {
            return Err(Error::validation("invalid lock reference"));
        }
        Ok(self.call(self.gateway.escrow(lock_reference)).await?)
    }

    /// A page of ledger entries.
    pub async fn ledger_entries(&self, limit: u32, offset: u32) -> Result<Value> {
        if limit == 0 || limit > MAX_LEDGER_PAGE {
            return Err(Error::validation(format!(
                "limit must be between 1 and {}",
                MAX_LEDGER_PAGE
            )));
        }
        Ok(self.call(self.gateway.ledger_entries(limit, offset)).await?)
    }

    async fn load(&self, session_id: &SessionId) -> Result<SessionRecord> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| Error::not_found(session_id.as_str()))
    }

    fn ensure_active(&self, record: &SessionRecord) -> Result<()> {
        if record.is_active() {
            return Ok(());
        }
        metrics().terminal_conflicts.inc();
        Err(Error::already_terminal(
            record.session_id.as_str(),
            record.status(),
        ))
    }

    /// Atomic `active -> terminal`. Losers get `SessionAlreadyTerminal`.
    async fn commit(
        &self,
        session_id: &SessionId,
        terminal: billing_core::SessionState,
    ) -> Result<SessionRecord> {
        match self.store.close(session_id, terminal).await? {
            CloseOutcome::Closed(record) => {
                metrics().active_sessions.dec();
                Ok(record)
            }
            CloseOutcome::AlreadyTerminal(status) => {
                metrics().terminal_conflicts.inc();
                info!(session_id = %session_id, status = %status, "Lost terminal transition race");
                Err(Error::already_terminal(session_id.as_str(), status))
            }
            CloseOutcome::NotFound => Err(Error::not_found(session_id.as_str())),
        }
    }

    /// Records the receipt and builds the summary. A failed receipt write
    /// does not change the outcome.
    async fn finish(&self, closed: SessionRecord, receipt: GatewayReceipt) -> Result<SessionSummary> {
        if let Err(e) = self
            .store
            .update(&closed.session_id, SessionPatch::SetReceipt(receipt.clone()))
            .await
        {
            error!(session_id = %closed.session_id, error = %e, "Failed to record gateway receipt");
        }

        closed
            .summary(receipt)
            .ok_or_else(|| Error::internal("closed session has no closure"))
    }

    /// Refunds the lock of a session that never made it into the store.
    async fn compensate(&self, record: &SessionRecord) {
        metrics().compensating_refunds.inc();
        let refund = RefundRequest {
            lock_reference: record.lock_reference.clone(),
            amount: record.locked_amount(),
            reason: COMPENSATION_REASON.to_string(),
        };

        if let Err(e) = self.call(self.gateway.refund(refund)).await {
            error!(
                session_id = %record.session_id,
                lock_reference = %record.lock_reference,
                error = %e,
                "Compensating refund failed, lock needs manual release"
            );
        }
    }

    /// Bounds a gateway call by the engine's own timeout.
    async fn call<T>(
        &self,
        fut: impl Future<Output = std::result::Result<T, GatewayError>>,
    ) -> std::result::Result<T, GatewayError> {
        let limit = Duration::from_millis(self.config.gateway_call_timeout_ms);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.gateway_call_timeout_ms)),
        }
    }
}
