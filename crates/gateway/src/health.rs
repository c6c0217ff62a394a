//! Gateway health checks.

use tracing::{debug, error};

use crate::PaymentGateway;

/// Checks gateway reachability with a balance lookup.
pub async fn check_connection(gateway: &dyn PaymentGateway) -> bool {
    match gateway.balance().await {
        Ok(_) => {
            debug!("Payment gateway connection healthy");
            true
        }
        Err(e) => {
            error!("Payment gateway health check failed: {}", e);
            false
        }
    }
}
