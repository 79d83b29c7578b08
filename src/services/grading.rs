//! Manual grading: per-response points with a session-level rollup.

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, ExamSession, Response, User};
use crate::db::types::SessionStatus;
use crate::repositories;
use crate::services::access_policy;
use crate::services::catalog::{self, QuestionWithOptions};
use crate::services::error::SessionError;

#[derive(Debug)]
pub(crate) struct GradeOutcome {
    pub(crate) response: Response,
    pub(crate) session: ExamSession,
}

#[derive(Debug)]
pub(crate) struct GradingView {
    pub(crate) session: ExamSession,
    pub(crate) exam: Exam,
    pub(crate) student: User,
    pub(crate) questions: Vec<QuestionWithOptions>,
    pub(crate) responses: Vec<Response>,
}

/// Status after a grade lands: graded once nothing is left ungraded, otherwise unchanged.
pub(crate) fn rollup_status(current: SessionStatus, ungraded: i64) -> SessionStatus {
    if ungraded == 0 {
        SessionStatus::Graded
    } else {
        current
    }
}

pub(crate) async fn grade_response(
    state: &AppState,
    grader: &User,
    response_id: &str,
    points: i32,
    feedback: Option<&str>,
) -> Result<GradeOutcome, SessionError> {
    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    let response = repositories::responses::find_by_id(&mut *tx, response_id)
        .await
        .map_err(SessionError::db("Failed to fetch response"))?
        .ok_or_else(|| SessionError::not_found("Response not found"))?;

    let session = repositories::sessions::lock_for_update(&mut *tx, &response.session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .ok_or_else(|| SessionError::not_found("Response not found"))?;

    let exam = repositories::exams::find_by_id(&mut *tx, &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Response not found"))?;

    if !access_policy::can_grade(grader, &exam) {
        return Err(SessionError::Forbidden("Only the exam creator can grade this response"));
    }
    if session.status == SessionStatus::InProgress {
        return Err(SessionError::conflict("Session has not been submitted yet"));
    }

    let question = repositories::questions::find_in_exam(&mut *tx, &exam.id, &response.question_id)
        .await
        .map_err(SessionError::db("Failed to fetch question"))?
        .ok_or_else(|| SessionError::not_found("Question not found"))?;

    if points < 0 || points > question.points {
        return Err(SessionError::validation(format!(
            "points must be between 0 and {}",
            question.points
        )));
    }

    let now = primitive_now_utc();
    let response = repositories::responses::grade(
        &mut *tx,
        repositories::responses::GradeResponse {
            id: &response.id,
            points,
            feedback,
            graded_by: &grader.id,
            graded_at: now,
        },
    )
    .await
    .map_err(SessionError::db("Failed to grade response"))?;

    let totals = repositories::responses::totals_for_session(&mut *tx, &session.id)
        .await
        .map_err(SessionError::db("Failed to total session"))?;
    let status = rollup_status(session.status, totals.ungraded);
    if !session.status.can_transition_to(status) {
        return Err(SessionError::conflict("Session status cannot move backwards"));
    }
    let total_points = i32::try_from(totals.total_points)
        .map_err(|_| SessionError::validation("Session total is out of range"))?;

    let updated =
        repositories::sessions::update_grading_rollup(&mut *tx, &session.id, total_points, status, now)
            .await
            .map_err(SessionError::db("Failed to update session totals"))?;

    tx.commit().await.map_err(SessionError::db("Failed to commit grade"))?;

    metrics::counter!("exam_responses_graded_total").increment(1);
    if session.status != SessionStatus::Graded && updated.status == SessionStatus::Graded {
        metrics::counter!("exam_sessions_graded_total").increment(1);
    }
    tracing::info!(
        response_id = %response.id,
        session_id = %updated.id,
        grader_id = %grader.id,
        points,
        total_points,
        status = ?updated.status,
        "Response graded"
    );

    Ok(GradeOutcome { response, session: updated })
}

pub(crate) async fn session_for_grading(
    state: &AppState,
    grader: &User,
    session_id: &str,
) -> Result<GradingView, SessionError> {
    let session = repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .ok_or_else(|| SessionError::not_found("Session not found"))?;

    let exam = repositories::exams::find_by_id(state.db(), &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Session not found"))?;

    if !access_policy::can_grade(grader, &exam) {
        return Err(SessionError::Forbidden("Only the exam creator can grade this session"));
    }

    let student = repositories::users::find_by_id(state.db(), &session.user_id)
        .await
        .map_err(SessionError::db("Failed to fetch student"))?
        .ok_or_else(|| SessionError::not_found("Student not found"))?;
    let questions = catalog::load_questions(state.db(), &exam.id)
        .await
        .map_err(SessionError::db("Failed to fetch questions"))?;
    let responses = repositories::responses::list_for_session(state.db(), &session.id)
        .await
        .map_err(SessionError::db("Failed to fetch responses"))?;

    Ok(GradingView { session, exam, student, questions, responses })
}
