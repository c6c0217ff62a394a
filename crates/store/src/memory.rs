//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use billing_core::{Error, Result, SessionId, SessionPatch, SessionRecord, SessionState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{CloseOutcome, SessionStore, StoreBackend};

/// Session records in a map behind a single lock.
///
/// Every mutation holds the write lock for the whole read-check-write, which
/// makes `close` a compare-and-swap on status.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(&self, record: SessionRecord) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.session_id) {
            return Err(Error::store(format!(
                "session {} already exists",
                record.session_id
            )));
        }
        records.insert(record.session_id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn update(&self, id: &SessionId, patch: SessionPatch) -> Result<Option<SessionRecord>> {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            return Ok(None);
        };
        record.apply(patch)?;
        Ok(Some(record.clone()))
    }

    async fn close(&self, id: &SessionId, terminal: SessionState) -> Result<CloseOutcome> {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            return Ok(CloseOutcome::NotFound);
        };

        Ok(match record.close(terminal) {
            Ok(()) => CloseOutcome::Closed(record.clone()),
            Err(status) => CloseOutcome::AlreadyTerminal(status),
        })
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        Ok(self.records.write().remove(id).is_some())
    }

    async fn purge_terminal(&self, ended_before: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| match record.ended_at() {
            Some(ended_at) => ended_at >= ended_before,
            None => true,
        });
        Ok(before - records.len())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
