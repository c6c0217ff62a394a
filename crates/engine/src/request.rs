//! Engine inputs.

use billing_core::limits::{MAX_ID_LEN, MAX_REASON_LEN};
use billing_core::{BillingTerms, Error, ResourceRef, Result};
use rust_decimal::Decimal;

use crate::config::BillingConfig;

/// How the price of a session is stated.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingTerms {
    /// Per-minute rate; the ceiling falls back to the per-kind default.
    Rate {
        rate_per_minute: Decimal,
        lock_ceiling_minutes: Option<u32>,
    },
    /// Total budget for content of a known length; the rate is derived.
    Budget {
        locked_amount: Decimal,
        duration_minutes: u32,
    },
}

/// A request to open a billing window.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSession {
    pub resource: ResourceRef,
    pub payer: String,
    pub pricing: PricingTerms,
    /// Shown on the payment intent
    pub description: Option<String>,
}

impl StartSession {
    pub(crate) fn validate(&self) -> Result<()> {
        check_id("resource id", &self.resource.id)?;
        check_id("payer", &self.payer)
    }

    pub(crate) fn resolve_terms(&self, config: &BillingConfig) -> Result<BillingTerms> {
        match self.pricing {
            PricingTerms::Rate {
                rate_per_minute,
                lock_ceiling_minutes,
            } => {
                let ceiling =
                    lock_ceiling_minutes.unwrap_or_else(|| config.default_ceiling(self.resource.kind));
                BillingTerms::from_rate(rate_per_minute, ceiling)
            }
            PricingTerms::Budget {
                locked_amount,
                duration_minutes,
            } => BillingTerms::from_budget(locked_amount, duration_minutes),
        }
    }

    pub(crate) fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Payment for {} {}", self.resource.kind.as_str(), self.resource.id))
    }
}

fn check_id(field: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > MAX_ID_LEN {
        return Err(Error::validation(format!(
            "{} exceeds {} characters",
            field, MAX_ID_LEN
        )));
    }
    Ok(())
}

/// Normalizes a cancellation reason.
pub(crate) fn cancel_reason(reason: Option<&str>) -> Result<String> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty()).unwrap_or("user_cancelled");
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(Error::validation(format!(
            "reason exceeds {} characters",
            MAX_REASON_LEN
        )));
    }
    Ok(reason.to_string())
}
