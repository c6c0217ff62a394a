//! HTTP client for the Finternet payment-intents API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::{
    extract_field, DeliveryProofBody, FundLock, LockRequest, PaymentIntentBody, Refund,
    RefundBody, RefundRequest, SettleRequest, Settlement,
};
use crate::PaymentGateway;

const PAYMENT_INTENTS_PATH: &str = "/api/v1/payment-intents";
const BALANCE_PATH: &str = "/api/v1/payment-intents/account/balance";
const LEDGER_PATH: &str = "/api/v1/payment-intents/account/ledger-entries";

const BALANCE_CACHE_KEY: &str = "balance";

/// Escrow gateway client.
///
/// Every request carries the configured timeout; a timed-out call surfaces
/// as `GatewayError::Timeout`, never as an indeterminate result.
#[derive(Clone)]
pub struct FinternetClient {
    config: GatewayConfig,
    http_client: reqwest::Client,
    /// Short-lived balance cache
    balance_cache: Cache<&'static str, Value>,
}

impl FinternetClient {
    /// Creates a new gateway client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let balance_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(config.balance_cache_secs.max(1)))
            .build();

        info!(
            base_url = %config.trimmed_base_url(),
            timeout_ms = config.request_timeout_ms,
            "Created payment gateway client"
        );

        Ok(Self {
            config,
            http_client,
            balance_cache,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.trimmed_base_url(), path)
    }

    fn intent_url(&self, lock_reference: &str, suffix: &str) -> String {
        self.url(&format!("{}/{}{}", PAYMENT_INTENTS_PATH, lock_reference, suffix))
    }

    /// Sends a request and decodes the JSON body, recording latency.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<Value, GatewayError> {
        let start = Instant::now();
        let result = self.execute(request).await;
        let elapsed = start.elapsed();

        metrics()
            .gateway_latency_ms
            .observe(elapsed.as_millis() as u64);

        match &result {
            Ok(_) => debug!(
                operation = operation,
                latency_ms = %elapsed.as_millis(),
                "Gateway request succeeded"
            ),
            Err(e) => {
                metrics().gateway_errors.inc();
                warn!(
                    operation = operation,
                    latency_ms = %elapsed.as_millis(),
                    error = %e,
                    "Gateway request failed"
                );
            }
        }

        result
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, GatewayError> {
        let timeout_ms = self.config.request_timeout_ms;

        let response = request
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_ms))?;

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for FinternetClient {
    async fn lock_funds(&self, request: LockRequest) -> Result<FundLock, GatewayError> {
        let mut metadata = request.metadata;
        metadata.insert("sessionId".to_string(), request.reference.clone());
        metadata.insert("payer".to_string(), request.payer.clone());

        let body = PaymentIntentBody {
            amount: request.amount.to_string(),
            currency: &self.config.currency,
            intent_type: &self.config.intent_type,
            settlement_method: &self.config.settlement_method,
            settlement_destination: &self.config.settlement_destination,
            description: &request.description,
            metadata,
        };

        info!(
            amount = %request.amount,
            currency = %self.config.currency,
            reference = %request.reference,
            "Creating payment intent"
        );

        let response = self
            .send(
                self.http_client.post(self.url(PAYMENT_INTENTS_PATH)).json(&body),
                "lock_funds",
            )
            .await?;

        let lock_reference = extract_field(&response, &["id", "intentId", "lock_id"])
            .ok_or_else(|| GatewayError::Decode("payment intent response has no id".into()))?;

        Ok(FundLock {
            lock_reference,
            status: extract_field(&response, &["status"]),
        })
    }

    async fn settle(&self, request: SettleRequest) -> Result<Settlement, GatewayError> {
        let body = DeliveryProofBody {
            proof: &request.proof,
            amount: request.amount.to_string(),
            reference: &request.reference,
        };

        let url = self.intent_url(&request.lock_reference, "/escrow/delivery-proof");
        match self
            .send(self.http_client.post(url).json(&body), "settle")
            .await
        {
            Ok(response) => Ok(Settlement {
                settlement_id: extract_field(
                    &response,
                    &["transaction_id", "transactionId", "settlementId", "id"],
                ),
            }),
            Err(GatewayError::Rejected { status: 404, .. }) => Err(GatewayError::Unavailable(
                format!("delivery proof endpoint not found for {}", request.lock_reference),
            )),
            Err(e) => Err(e),
        }
    }

    async fn refund(&self, request: RefundRequest) -> Result<Refund, GatewayError> {
        let body = RefundBody {
            amount: request.amount.to_string(),
            reason: &request.reason,
        };

        let url = self.intent_url(&request.lock_reference, "/escrow/refund");
        let response = self
            .send(self.http_client.post(url).json(&body), "refund")
            .await?;

        Ok(Refund {
            refund_id: extract_field(&response, &["refund_id", "refundId", "id"]),
        })
    }

    async fn balance(&self) -> Result<Value, GatewayError> {
        if self.config.balance_cache_secs > 0 {
            if let Some(cached) = self.balance_cache.get(&BALANCE_CACHE_KEY).await {
                debug!("Balance cache hit");
                return Ok(cached);
            }
        }

        let balance = self
            .send(self.http_client.get(self.url(BALANCE_PATH)), "balance")
            .await?;

        if self.config.balance_cache_secs > 0 {
            self.balance_cache
                .insert(BALANCE_CACHE_KEY, balance.clone())
                .await;
        }

        Ok(balance)
    }

    async fn escrow(&self, lock_reference: &str) -> Result<Value, GatewayError> {
        let url = self.intent_url(lock_reference, "/escrow");
        self.send(self.http_client.get(url), "escrow").await
    }

    async fn ledger_entries(&self, limit: u32, offset: u32) -> Result<Value, GatewayError> {
        let request = self
            .http_client
            .get(self.url(LEDGER_PATH))
            .query(&[("limit", limit), ("offset", offset)]);
        self.send(request, "ledger_entries").await
    }
}
