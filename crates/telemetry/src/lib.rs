//! Logging, metrics, and health reporting for the billing service.
//!
//! Metrics stay in-process and are served as a JSON snapshot; there is no
//! external metrics backend.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
