//! Dependency health probing.

use payment_gateway::PaymentGateway;
use session_store::SessionStore;
use telemetry::health;

/// Checks the gateway and the store and records the result in the health registry.
pub async fn probe_dependencies(gateway: &dyn PaymentGateway, store: &dyn SessionStore) {
    if session_store::health::check_connection(store).await {
        health().store.set_healthy();
    } else {
        health().store.set_unhealthy("Session store unreachable");
    }

    if gateway.is_healthy() && payment_gateway::health::check_connection(gateway).await {
        health().gateway.set_healthy();
    } else {
        health().gateway.set_unhealthy("Payment gateway unreachable");
    }
}
