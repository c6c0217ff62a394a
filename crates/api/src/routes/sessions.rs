//! Session lifecycle endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use billing_core::{SessionId, SessionSnapshot};
use tracing::debug;

use crate::extractors::ValidatedJson;
use crate::requests::{
    CancelSessionRequest, EndSessionRequest, FeedbackRequest, QuizScoreRequest,
    StartSessionRequest,
};
use crate::response::{
    ApiError, SessionDetailResponse, SessionSummaryResponse, StartSessionResponse,
    SuccessResponse,
};
use crate::state::AppState;

/// POST /session/start - Lock funds and open a session.
pub async fn start_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>), ApiError> {
    let record = state.engine.start(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /session/status/{session_id} - Live elapsed time and cost estimate.
pub async fn status_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state.engine.poll_status(&SessionId::from(session_id)).await?;
    debug!(
        session_id = %snapshot.session_id,
        elapsed_seconds = snapshot.elapsed_seconds,
        "Status polled"
    );
    Ok(Json(snapshot))
}

/// POST /session/end - Settle for elapsed time.
pub async fn end_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EndSessionRequest>,
) -> Result<Json<SessionSummaryResponse>, ApiError> {
    let summary = state.engine.end(&SessionId::from(request.session_id)).await?;
    Ok(Json(summary.into()))
}

/// POST /session/cancel - Refund the whole lock.
pub async fn cancel_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CancelSessionRequest>,
) -> Result<Json<SessionSummaryResponse>, ApiError> {
    let summary = state
        .engine
        .cancel(&SessionId::from(request.session_id), request.reason.as_deref())
        .await?;
    Ok(Json(summary.into()))
}

/// GET /session/{session_id} - Full record with side data.
pub async fn detail_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let record = state.engine.get(&SessionId::from(session_id)).await?;
    Ok(Json(record.into()))
}

/// POST /session/{session_id}/quiz-score
pub async fn quiz_score_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<QuizScoreRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let number = state
        .engine
        .attach_quiz_score(
            &SessionId::from(session_id),
            request.score,
            request.total,
            request.position_secs,
        )
        .await?;
    Ok(Json(SuccessResponse::quiz(number)))
}

/// POST /session/{session_id}/feedback
pub async fn feedback_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<FeedbackRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .engine
        .attach_feedback(&SessionId::from(session_id), request.stars, request.comment)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
