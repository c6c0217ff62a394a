//! Core types, billing arithmetic, and errors for pay-per-minute sessions.

pub mod billing;
pub mod clock;
pub mod error;
pub mod limits;
pub mod session;
pub mod side_data;

pub use billing::{BillingTerms, Charge};
pub use clock::*;
pub use error::{Error, Result};
pub use session::*;
pub use side_data::*;
