//! Background workers for the session billing service.
//!
//! - Eviction (finished sessions past their retention window)
//! - Health probe (gateway and store reachability)

pub mod eviction;
pub mod health_probe;
pub mod scheduler;

pub use eviction::EvictionWorker;
pub use health_probe::probe_dependencies;
pub use scheduler::*;
