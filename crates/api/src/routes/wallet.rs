//! Gateway pass-through endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::requests::LedgerQuery;
use crate::response::ApiError;
use crate::state::AppState;

/// GET /wallet/balance - Merchant balance (briefly cached by the client).
pub async fn balance_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.engine.balance().await?))
}

/// GET /escrow/{lock_reference}
pub async fn escrow_handler(
    State(state): State<AppState>,
    Path(lock_reference): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.engine.escrow(&lock_reference).await?))
}

/// GET /ledger/entries?limit&offset
pub async fn ledger_handler(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .engine
            .ledger_entries(query.limit, query.offset)
            .await?,
    ))
}
