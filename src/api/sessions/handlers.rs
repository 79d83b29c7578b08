use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::PageQuery;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::session::{
    ActiveSessionResponse, HistoryItem, SaveResponseRequest, SaveResponseResult,
    SavedResponseView, SessionResponse, SessionResultResponse, SubmitResponse,
};
use crate::services::sessions::{self, SaveResponseInput};
use crate::services::submission_finalize;

const SAVE_RATE_WINDOW_SECONDS: u64 = 60;

/// Scoped to the caller so a stranger cannot drain the owner's save budget.
pub(super) fn save_rate_key(user_id: &str, session_id: &str) -> String {
    format!("rl:save:{user_id}:{session_id}")
}

pub(super) async fn start_session(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let outcome = sessions::start(&state, &user, &exam_id).await?;
    let status = if outcome.resumed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(SessionResponse::from_db(&outcome.session))))
}

pub(super) async fn get_active_session(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ActiveSessionResponse>, ApiError> {
    let active = sessions::get_active(&state, &user, &session_id).await?;
    Ok(Json(ActiveSessionResponse::from_active(
        &active,
        state.settings().exam().auto_save_interval_seconds,
    )))
}

pub(super) async fn save_response(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SaveResponseRequest>,
) -> Result<Json<SaveResponseResult>, ApiError> {
    validate_payload(&payload)?;

    let rate_key = save_rate_key(&user.id, &session_id);
    let allowed = state
        .redis()
        .rate_limit(
            &rate_key,
            state.settings().exam().save_rate_limit_per_minute,
            SAVE_RATE_WINDOW_SECONDS,
        )
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many saves, try again shortly"));
    }

    let response = sessions::save_response(
        &state,
        &user,
        &session_id,
        SaveResponseInput {
            question_id: &payload.question_id,
            response_text: payload.response_text.as_deref(),
            selected_option_id: payload.selected_option_id.as_deref(),
        },
    )
    .await?;

    Ok(Json(SaveResponseResult { success: true, response: SavedResponseView::from_db(&response) }))
}

pub(super) async fn submit_session(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let session = submission_finalize::submit(&state, &user, &session_id).await?;
    Ok(Json(SubmitResponse::from_db(&session)))
}

pub(super) async fn history(
    Query(params): Query<PageQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let (skip, limit) = params.normalized();
    let rows = sessions::history(&state, &user, skip, limit).await?;
    Ok(Json(rows.into_iter().map(HistoryItem::from_row).collect()))
}

pub(super) async fn session_result(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SessionResultResponse>, ApiError> {
    let result = sessions::result(&state, &user, &session_id).await?;
    Ok(Json(SessionResultResponse::from_result(&result)))
}
