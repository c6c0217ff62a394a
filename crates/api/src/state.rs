//! Application state shared across handlers.

use std::sync::Arc;

use billing_engine::SessionEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Billing engine (real gateway in production, mock in tests)
    pub engine: Arc<SessionEngine>,
}

impl AppState {
    pub fn new(engine: Arc<SessionEngine>) -> Self {
        Self { engine }
    }
}
