//! Escrow payment gateway client for the session billing engine.

pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod types;

pub use client::*;
pub use config::*;
pub use error::*;
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;

/// Fund-lock, settlement and refund operations against an escrow provider.
///
/// `FinternetClient` talks to the real provider; tests swap in a mock.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Reserve funds. Must return the provider's lock reference.
    async fn lock_funds(&self, request: LockRequest) -> Result<FundLock, GatewayError>;

    /// Charge the final amount against a lock.
    async fn settle(&self, request: SettleRequest) -> Result<Settlement, GatewayError>;

    /// Return locked funds to the payer.
    async fn refund(&self, request: RefundRequest) -> Result<Refund, GatewayError>;

    /// Merchant account balance, as reported by the provider.
    async fn balance(&self) -> Result<Value, GatewayError>;

    /// Escrow details for a lock.
    async fn escrow(&self, lock_reference: &str) -> Result<Value, GatewayError>;

    /// Account ledger, newest first.
    async fn ledger_entries(&self, limit: u32, offset: u32) -> Result<Value, GatewayError>;

    fn is_healthy(&self) -> bool {
        true
    }
}
