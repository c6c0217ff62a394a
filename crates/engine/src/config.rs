//! Billing engine configuration.

use billing_core::limits::{DEFAULT_TEACHING_CEILING_MINUTES, DEFAULT_VIDEO_CEILING_MINUTES};
use billing_core::ResourceKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Lock ceiling for teaching sessions when the request gives none
    #[serde(default = "default_teaching_ceiling")]
    pub teaching_lock_ceiling_minutes: u32,
    /// Lock ceiling for video sessions when the request gives none
    #[serde(default = "default_video_ceiling")]
    pub video_lock_ceiling_minutes: u32,
    /// Address that signs delivery proofs
    #[serde(default = "default_payee_address")]
    pub payee_address: String,
    /// Base URI under which delivery proofs are published
    #[serde(default = "default_proof_base_url")]
    pub proof_base_url: String,
    /// Upper bound on any single gateway call, on top of the client's own timeout
    #[serde(default = "default_gateway_call_timeout_ms")]
    pub gateway_call_timeout_ms: u64,
}

fn default_teaching_ceiling() -> u32 {
    DEFAULT_TEACHING_CEILING_MINUTES
}

fn default_video_ceiling() -> u32 {
    DEFAULT_VIDEO_CEILING_MINUTES
}

fn default_payee_address() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

fn default_proof_base_url() -> String {
    "https://murph.app/proofs".to_string()
}

fn default_gateway_call_timeout_ms() -> u64 {
    35000
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            teaching_lock_ceiling_minutes: default_teaching_ceiling(),
            video_lock_ceiling_minutes: default_video_ceiling(),
            payee_address: default_payee_address(),
            proof_base_url: default_proof_base_url(),
            gateway_call_timeout_ms: default_gateway_call_timeout_ms(),
        }
    }
}

impl BillingConfig {
    /// Default lock ceiling for a resource kind.
    pub fn default_ceiling(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Teaching => self.teaching_lock_ceiling_minutes,
            ResourceKind::Video => self.video_lock_ceiling_minutes,
        }
    }
}
