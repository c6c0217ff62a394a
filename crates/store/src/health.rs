//! Session store health checks.

use tracing::{debug, error};

use crate::SessionStore;

/// Check session store reachability.
pub async fn check_connection(store: &dyn SessionStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            debug!(backend = ?store.backend(), "Session store healthy");
            true
        }
        Err(e) => {
            error!(backend = ?store.backend(), "Session store health check failed: {}", e);
            false
        }
    }
}
