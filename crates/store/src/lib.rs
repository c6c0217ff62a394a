//! Session record storage.
//!
//! Every backend makes the `active -> terminal` transition a single atomic
//! check-and-set, so two concurrent end/cancel calls cannot both win.

pub mod config;
pub mod health;
pub mod memory;
pub mod redis_store;

pub use config::*;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::sync::Arc;

use async_trait::async_trait;
use billing_core::{Result, SessionId, SessionPatch, SessionRecord, SessionState, SessionStatus};
use chrono::{DateTime, Utc};
use tracing::info;

/// Result of an atomic close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// This caller performed the transition; the record as it now stands.
    Closed(SessionRecord),
    /// Someone else already closed it.
    AlreadyTerminal(SessionStatus),
    NotFound,
}

/// Keyed persistence for session records.
///
/// Absence is a normal outcome (`Ok(None)`, `Ok(false)`), never an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new record. Fails if the id is already taken.
    async fn put(&self, record: SessionRecord) -> Result<()>;

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Applies a patch atomically. Returns the updated record, or `None` if absent.
    async fn update(&self, id: &SessionId, patch: SessionPatch) -> Result<Option<SessionRecord>>;

    /// Moves an active record to `terminal` if, and only if, it is still active.
    async fn close(&self, id: &SessionId, terminal: SessionState) -> Result<CloseOutcome>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &SessionId) -> Result<bool>;

    /// Removes terminal records that ended before `ended_before`. Returns how many went.
    async fn purge_terminal(&self, ended_before: DateTime<Utc>) -> Result<usize>;

    /// Round-trip to the backend.
    async fn ping(&self) -> Result<()>;

    fn backend(&self) -> StoreBackend;
}

/// Builds the configured backend.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Redis => Arc::new(RedisStore::connect(config.clone()).await?),
    };

    info!(backend = ?config.backend, "Session store ready");
    Ok(store)
}
