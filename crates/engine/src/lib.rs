//! Pay-per-minute billing sessions: lock funds at start, meter wall-clock
//! time, settle or refund exactly once at the end.

pub mod config;
pub mod engine;
pub mod request;

pub use config::BillingConfig;
pub use engine::{SessionEngine, MAX_LEDGER_PAGE};
pub use request::{PricingTerms, StartSession};
