use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentInstructor, CurrentUser};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::schemas::exam::{
    AssignRequest, AssignedExamResponse, AssignmentResult, ExamCreate, ExamResponse,
    ExamSessionListItem, QuestionCreate, QuestionView,
};
use crate::services::catalog;

pub(super) async fn create_exam(
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    validate_payload(&payload)?;

    let (exam, questions) = catalog::create_exam(&state, &user, &payload).await?;

    Ok((StatusCode::CREATED, Json(ExamResponse::from_parts(exam, &questions))))
}

pub(super) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let (exam, questions) = catalog::exam_definition(&state, &user, &exam_id).await?;
    Ok(Json(ExamResponse::from_parts(exam, &questions)))
}

pub(super) async fn add_question(
    Path(exam_id): Path<String>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionView>), ApiError> {
    validate_payload(&payload)?;

    let question = catalog::add_question(&state, &user, &exam_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(QuestionView::from_bundle(&question, true))))
}

pub(super) async fn finalize_exam(
    Path(exam_id): Path<String>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    catalog::finalize_exam(&state, &user, &exam_id).await?;
    let (exam, questions) = catalog::exam_definition(&state, &user, &exam_id).await?;
    Ok(Json(ExamResponse::from_parts(exam, &questions)))
}

pub(super) async fn assign_exam(
    Path(exam_id): Path<String>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<AssignmentResult>, ApiError> {
    validate_payload(&payload)?;

    let newly_assigned = catalog::assign_users(&state, &user, &exam_id, &payload.user_ids).await?;

    Ok(Json(AssignmentResult { exam_id, requested: payload.user_ids.len(), newly_assigned }))
}

pub(super) async fn list_assigned_exams(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignedExamResponse>>, ApiError> {
    let rows = catalog::list_assigned(&state, &user).await?;
    Ok(Json(rows.into_iter().map(AssignedExamResponse::from_row).collect()))
}

pub(super) async fn list_exam_sessions(
    Path(exam_id): Path<String>,
    Query(params): Query<PageQuery>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ExamSessionListItem>>, ApiError> {
    let (skip, limit) = params.normalized();
    let (rows, total_count) =
        catalog::list_exam_sessions(&state, &user, &exam_id, skip, limit).await?;

    Ok(Json(PaginatedResponse {
        items: rows.into_iter().map(ExamSessionListItem::from_row).collect(),
        total_count,
        skip,
        limit,
    }))
}
