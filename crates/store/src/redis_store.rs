//! Redis-backed session store.
//!
//! Each record is one JSON string at `{prefix}:{session_id}`. Terminal
//! sessions are also indexed by end time in the `{prefix}:terminal` sorted
//! set so they can be purged. Every write after `put` goes through a Lua
//! compare-and-set on the whole record, so a status check and the write
//! that follows it are one atomic step.

use async_trait::async_trait;
use billing_core::{Error, Result, SessionId, SessionPatch, SessionRecord, SessionState};
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::{CloseOutcome, SessionStore, StoreBackend, StoreConfig};

/// Lua compare-and-set.
///
/// KEYS[1] = record key
/// KEYS[2] = terminal index
/// ARGV[1] = expected current JSON
/// ARGV[2] = replacement JSON
/// ARGV[3] = TTL seconds (0 keeps the current TTL)
/// ARGV[4] = index score (end time in ms, empty to skip indexing)
/// ARGV[5] = index member (session id)
///
/// Returns:
///   1 = written
///   0 = record changed since it was read
///  -1 = record missing
const COMPARE_AND_SET_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if not current then
        return -1
    end
    if current ~= ARGV[1] then
        return 0
    end

    local ttl = tonumber(ARGV[3])
    if ttl > 0 then
        redis.call('SET', KEYS[1], ARGV[2], 'EX', ttl)
    else
        redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
    end

    if ARGV[4] ~= '' then
        redis.call('ZADD', KEYS[2], ARGV[4], ARGV[5])
    end
    return 1
"#;

/// Attempts before a contended compare-and-set gives up.
const MAX_CAS_ATTEMPTS: usize = 8;

pub struct RedisStore {
    conn: ConnectionManager,
    config: StoreConfig,
    cas_script: redis::Script,
}

/// What a compare-and-set loop should do with the record it just read.
enum Mutation {
    Write { record: SessionRecord, closing: bool },
    Skip,
    Reject(Error),
}

impl RedisStore {
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| Error::store(format!("invalid redis url: {}", e)))?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::store(format!("redis connection failed: {}", e)))?;

        info!(
            key_prefix = %config.key_prefix,
            terminal_ttl_secs = config.terminal_ttl_secs,
            "Connected to Redis session store"
        );

        Ok(Self {
            conn,
            config,
            cas_script: redis::Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }

    fn record_key(&self, id: &SessionId) -> String {
        record_key(&self.config.key_prefix, id)
    }

    fn index_key(&self) -> String {
        index_key(&self.config.key_prefix)
    }

    async fn load(&self, key: &str) -> Result<Option<(String, SessionRecord)>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(redis_err)?;

        match raw {
            Some(raw) => {
                let record = serde_json::from_str(&raw)?;
                Ok(Some((raw, record)))
            }
            None => Ok(None),
        }
    }

    /// Read, mutate, compare-and-set, retrying when another writer got there first.
    ///
    /// `mutate` returns `Skip` to stop without writing; the loop then reports
    /// the record it read. `Reject` stops with an error.
    async fn compare_and_set<F>(&self, id: &SessionId, mut mutate: F) -> Result<CasResult>
    where
        F: FnMut(SessionRecord) -> Mutation + Send,
    {
        let key = self.record_key(id);
        let index = self.index_key();

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some((raw, current)) = self.load(&key).await? else {
                return Ok(CasResult::Missing);
            };

            let (next, closing) = match mutate(current.clone()) {
                Mutation::Write { record, closing } => (record, closing),
                Mutation::Skip => return Ok(CasResult::Skipped(current)),
                Mutation::Reject(e) => return Err(e),
            };

            let replacement = serde_json::to_string(&next)?;
            let (ttl, score) = match next.ended_at().filter(|_| closing) {
                Some(ended_at) => (
                    self.config.terminal_ttl_secs,
                    ended_at.timestamp_millis().to_string(),
                ),
                None => (0, String::new()),
            };

            let mut conn = self.conn.clone();
            let outcome: i64 = self
                .cas_script
                .key(&key)
                .key(&index)
                .arg(&raw)
                .arg(&replacement)
                .arg(ttl)
                .arg(&score)
                .arg(id.as_str())
                .invoke_async(&mut conn)
                .await
                .map_err(redis_err)?;

            match outcome {
                1 => return Ok(CasResult::Written(next)),
                -1 => return Ok(CasResult::Missing),
                _ => debug!(session_id = %id, attempt, "Record changed underneath, retrying"),
            }
        }

        warn!(session_id = %id, "Compare-and-set retries exhausted");
        Err(Error::store(format!(
            "session {} is under heavy contention, try again",
            id
        )))
    }
}

enum CasResult {
    Written(SessionRecord),
    Skipped(SessionRecord),
    Missing,
}

fn record_key(prefix: &str, id: &SessionId) -> String {
    format!("{}:{}", prefix, id)
}

fn index_key(prefix: &str) -> String {
    format!("{}:terminal", prefix)
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::store(format!("redis: {}", e))
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn put(&self, record: SessionRecord) -> Result<()> {
        let key = self.record_key(&record.session_id);
        let json = serde_json::to_string(&record)?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(json).arg("NX");
        if let Some(ttl) = self.config.active_ttl_secs.filter(|t| *t > 0) {
            cmd.arg("EX").arg(ttl);
        }

        let mut conn = self.conn.clone();
        let written: Option<String> = cmd.query_async(&mut conn).await.map_err(redis_err)?;
        if written.is_none() {
            return Err(Error::store(format!(
                "session {} already exists",
                record.session_id
            )));
        }

        debug!(session_id = %record.session_id, "Stored session record");
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.load(&self.record_key(id)).await?.map(|(_, record)| record))
    }

    async fn update(&self, id: &SessionId, patch: SessionPatch) -> Result<Option<SessionRecord>> {
        let result = self
            .compare_and_set(id, |mut record| match record.apply(patch.clone()) {
                Ok(()) => Mutation::Write {
                    record,
                    closing: false,
                },
                Err(e) => Mutation::Reject(e),
            })
            .await?;

        Ok(match result {
            CasResult::Written(record) | CasResult::Skipped(record) => Some(record),
            CasResult::Missing => None,
        })
    }

    async fn close(&self, id: &SessionId, terminal: SessionState) -> Result<CloseOutcome> {
        let result = self
            .compare_and_set(id, |mut record| match record.close(terminal.clone()) {
                Ok(()) => Mutation::Write {
                    record,
                    closing: true,
                },
                Err(_) => Mutation::Skip,
            })
            .await?;

        Ok(match result {
            CasResult::Written(record) => CloseOutcome::Closed(record),
            CasResult::Skipped(record) => CloseOutcome::AlreadyTerminal(record.status()),
            CasResult::Missing => CloseOutcome::NotFound,
        })
    }

    async fn delete(&self, id: &SessionId) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.record_key(id)).await.map_err(redis_err)?;
        let _: i64 = conn
            .zrem(self.index_key(), id.as_str())
            .await
            .map_err(redis_err)?;
        Ok(removed > 0)
    }

    async fn purge_terminal(&self, ended_before: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.conn.clone();
        let index = self.index_key();
        let cutoff = ended_before.timestamp_millis() - 1;

        let ids: Vec<String> = conn
            .zrangebyscore(&index, "-inf", cutoff)
            .await
            .map_err(redis_err)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = ids
            .iter()
            .map(|id| record_key(&self.config.key_prefix, &SessionId::from(id.as_str())))
            .collect();

        // Keys may already be gone through expiry; only count what DEL removed.
        let removed: i64 = conn.del(&keys).await.map_err(redis_err)?;
        let _: i64 = conn.zrem(&index, &ids).await.map_err(redis_err)?;

        Ok(removed.max(0) as usize)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Redis
    }
}
