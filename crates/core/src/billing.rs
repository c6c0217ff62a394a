//! Time and money arithmetic for pay-per-minute sessions.
//!
//! Every function here is pure and total over non-negative rates and
//! durations. Rounding to currency precision happens only where a charge,
//! refund, or lock amount is produced.

use chrono::Duration;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::limits::MAX_LOCK_CEILING_MINUTES;

/// Decimal places of the settlement currency.
pub const CURRENCY_SCALE: u32 = 2;

/// Rounds to two decimal places, half away from zero, with the scale fixed at two.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// Converts a wall-clock duration into fractional minutes. Negative durations clamp to zero.
pub fn elapsed_minutes(elapsed: Duration) -> Decimal {
    let millis = elapsed.num_milliseconds().max(0);
    Decimal::new(millis, 3) / Decimal::from(60)
}

/// Whole elapsed seconds, never negative.
pub fn elapsed_seconds(elapsed: Duration) -> u64 {
    elapsed.num_seconds().max(0) as u64
}

/// Uncapped running cost of an active session, for status polls.
pub fn live_estimate(rate_per_minute: Decimal, elapsed: Duration) -> Decimal {
    let raw = rate_per_minute
        .checked_mul(elapsed_minutes(elapsed))
        .unwrap_or(Decimal::MAX);
    round_currency(raw)
}

/// Final split of a locked amount into what is charged and what goes back to the payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub amount_charged: Decimal,
    pub amount_refunded: Decimal,
}

impl Charge {
    /// `min(rate * minutes, locked)` rounded to cents; the refund is the exact remainder.
    pub fn for_elapsed(rate_per_minute: Decimal, elapsed: Duration, locked_amount: Decimal) -> Self {
        let capped = match rate_per_minute.checked_mul(elapsed_minutes(elapsed)) {
            Some(raw) => raw.min(locked_amount),
            None => locked_amount,
        };
        let amount_charged = round_currency(capped).min(locked_amount);

        Self {
            amount_charged,
            amount_refunded: locked_amount - amount_charged,
        }
    }

    /// Cancellation: nothing charged, the whole lock refunded.
    pub fn full_refund(locked_amount: Decimal) -> Self {
        Self {
            amount_charged: round_currency(Decimal::ZERO),
            amount_refunded: locked_amount,
        }
    }
}

/// Rate and ceiling agreed at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingTerms {
    pub rate_per_minute: Decimal,
    pub lock_ceiling_minutes: u32,
    pub locked_amount: Decimal,
}

impl BillingTerms {
    /// Terms from a per-minute rate; the lock is `rate * ceiling`.
    pub fn from_rate(rate_per_minute: Decimal, lock_ceiling_minutes: u32) -> Result<Self> {
        if rate_per_minute <= Decimal::ZERO {
            return Err(Error::validation("rate_per_minute must be greater than zero"));
        }
        validate_ceiling(lock_ceiling_minutes)?;

        let locked_amount = rate_per_minute
            .checked_mul(Decimal::from(lock_ceiling_minutes))
            .map(round_currency)
            .ok_or_else(|| Error::validation("rate_per_minute is too large"))?;

        if locked_amount <= Decimal::ZERO {
            return Err(Error::validation(
                "rate_per_minute is too small to lock a non-zero amount",
            ));
        }

        Ok(Self {
            rate_per_minute,
            lock_ceiling_minutes,
            locked_amount,
        })
    }

    /// Terms from a total budget spread over the content duration; the rate is derived.
    pub fn from_budget(locked_amount: Decimal, duration_minutes: u32) -> Result<Self> {
        let locked_amount = round_currency(locked_amount);
        if locked_amount <= Decimal::ZERO {
            return Err(Error::validation("locked_amount must be greater than zero"));
        }
        validate_ceiling(duration_minutes)?;

        Ok(Self {
            rate_per_minute: locked_amount / Decimal::from(duration_minutes),
            lock_ceiling_minutes: duration_minutes,
            locked_amount,
        })
    }
}

fn validate_ceiling(minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(Error::validation("lock ceiling must be at least one minute"));
    }
    if minutes > MAX_LOCK_CEILING_MINUTES {
        return Err(Error::validation(format!(
            "lock ceiling of {} minutes exceeds the {} minute maximum",
            minutes, MAX_LOCK_CEILING_MINUTES
        )));
    }
    Ok(())
}
