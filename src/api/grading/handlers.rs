use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentInstructor;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::grading::{GradeRequest, GradeResultResponse, GradingSessionResponse};
use crate::services::grading;

pub(super) async fn grade_response(
    Path(response_id): Path<String>,
    CurrentInstructor(grader): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResultResponse>, ApiError> {
    validate_payload(&payload)?;

    let outcome = grading::grade_response(
        &state,
        &grader,
        &response_id,
        payload.points,
        payload.feedback.as_deref(),
    )
    .await?;

    Ok(Json(GradeResultResponse::from_outcome(&outcome)))
}

pub(super) async fn session_for_grading(
    Path(session_id): Path<String>,
    CurrentInstructor(grader): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<GradingSessionResponse>, ApiError> {
    let view = grading::session_for_grading(&state, &grader, &session_id).await?;
    Ok(Json(GradingSessionResponse::from_view(&view)))
}
