//! Session store configuration.

use serde::{Deserialize, Serialize};

/// Which backend holds session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; records are lost on restart
    Memory,
    /// Redis, shared across instances
    Redis,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Redis URL (redis backend only)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Prefix for every key written
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Expiry for active records. `None` keeps them until they end, so a
    /// locked session is never silently forgotten.
    #[serde(default)]
    pub active_ttl_secs: Option<u64>,
    /// How long completed and cancelled records are retained
    #[serde(default = "default_terminal_ttl_secs")]
    pub terminal_ttl_secs: u64,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "session".to_string()
}

fn default_terminal_ttl_secs() -> u64 {
    3600
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            active_ttl_secs: None,
            terminal_ttl_secs: default_terminal_ttl_secs(),
        }
    }
}
