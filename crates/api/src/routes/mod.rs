//! API routes.

pub mod health;
pub mod sessions;
pub mod wallet;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/session/start", post(sessions::start_handler))
        .route("/session/status/:session_id", get(sessions::status_handler))
        .route("/session/end", post(sessions::end_handler))
        .route("/session/cancel", post(sessions::cancel_handler))
        .route("/session/:session_id", get(sessions::detail_handler))
        .route("/session/:session_id/quiz-score", post(sessions::quiz_score_handler))
        .route("/session/:session_id/feedback", post(sessions::feedback_handler))
        .route("/wallet/balance", get(wallet::balance_handler))
        .route("/escrow/:lock_reference", get(wallet::escrow_handler))
        .route("/ledger/entries", get(wallet::ledger_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(health::metrics_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
