//! Payment gateway configuration.

use serde::{Deserialize, Serialize};

/// Escrow gateway client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL
    pub base_url: String,
    /// API key sent as `X-API-Key`
    #[serde(default)]
    pub api_key: String,
    /// Settlement currency
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long a balance lookup is served from cache (0 disables)
    #[serde(default = "default_balance_cache_secs")]
    pub balance_cache_secs: u64,
    /// Payment intent type
    #[serde(default = "default_intent_type")]
    pub intent_type: String,
    /// Settlement method requested on lock
    #[serde(default = "default_settlement_method")]
    pub settlement_method: String,
    /// Where settled funds are paid out
    #[serde(default = "default_settlement_destination")]
    pub settlement_destination: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_balance_cache_secs() -> u64 {
    5
}

fn default_intent_type() -> String {
    "DELIVERY_VS_PAYMENT".to_string()
}

fn default_settlement_method() -> String {
    "OFF_RAMP_MOCK".to_string()
}

fn default_settlement_destination() -> String {
    "teacher_bank_account".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: String::new(),
            currency: default_currency(),
            request_timeout_ms: default_request_timeout_ms(),
            balance_cache_secs: default_balance_cache_secs(),
            intent_type: default_intent_type(),
            settlement_method: default_settlement_method(),
            settlement_destination: default_settlement_destination(),
        }
    }
}

impl GatewayConfig {
    /// Base URL without a trailing slash.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
