//! Start, resume, read and autosave for a student's exam attempt.

use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, ExamSession, Response, User};
use crate::db::types::SessionStatus;
use crate::repositories;
use crate::repositories::sessions::HistoryRow;
use crate::services::access_policy;
use crate::services::catalog::{self, QuestionWithOptions};
use crate::services::error::SessionError;
use crate::services::session_timing;

const SESSION_NOT_FOUND: &str = "Session not found";
const ACTIVE_SESSION_NOT_FOUND: &str = "Active session not found";

#[derive(Debug)]
pub(crate) struct StartOutcome {
    pub(crate) session: ExamSession,
    pub(crate) resumed: bool,
}

#[derive(Debug)]
pub(crate) struct ActiveSession {
    pub(crate) session: ExamSession,
    pub(crate) exam: Exam,
    pub(crate) questions: Vec<QuestionWithOptions>,
    pub(crate) responses: Vec<Response>,
    pub(crate) deadline: PrimitiveDateTime,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug)]
pub(crate) struct SessionResult {
    pub(crate) session: ExamSession,
    pub(crate) exam: Exam,
    pub(crate) questions: Vec<QuestionWithOptions>,
    pub(crate) responses: Vec<Response>,
}

#[derive(Debug)]
pub(crate) struct SaveResponseInput<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) response_text: Option<&'a str>,
    pub(crate) selected_option_id: Option<&'a str>,
}

fn resume_or_conflict(existing: ExamSession, exam_id: &str) -> Result<StartOutcome, SessionError> {
    if existing.exam_id != exam_id {
        return Err(SessionError::conflict("You are already taking another exam"));
    }
    Ok(StartOutcome { session: existing, resumed: true })
}

/// Creates the caller's attempt, or returns the one already running for the same exam.
pub(crate) async fn start(
    state: &AppState,
    user: &User,
    exam_id: &str,
) -> Result<StartOutcome, SessionError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;

    let assigned = access_policy::is_assignee(state.db(), user, &exam)
        .await
        .map_err(SessionError::db("Failed to check assignment"))?;
    if !assigned {
        return Err(SessionError::Forbidden("You are not assigned to this exam"));
    }

    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    repositories::sessions::lock_user_sessions(&mut *tx, &user.id)
        .await
        .map_err(SessionError::db("Failed to lock user sessions"))?;

    let existing = repositories::sessions::find_in_progress_for_user(&mut *tx, &user.id)
        .await
        .map_err(SessionError::db("Failed to fetch active session"))?;
    if let Some(existing) = existing {
        let outcome = resume_or_conflict(existing, &exam.id)?;
        tx.commit().await.map_err(SessionError::db("Failed to commit transaction"))?;
        tracing::info!(session_id = %outcome.session.id, user_id = %user.id, "Resumed exam session");
        return Ok(outcome);
    }

    let now = primitive_now_utc();
    if !session_timing::is_available(&exam, now) {
        return Err(SessionError::validation("Exam is not available"));
    }

    let inserted = repositories::sessions::insert_in_progress(
        &mut *tx,
        &Uuid::new_v4().to_string(),
        &exam.id,
        &user.id,
        now,
    )
    .await
    .map_err(SessionError::db("Failed to create session"))?;

    let outcome = match inserted {
        Some(session) => StartOutcome { session, resumed: false },
        None => {
            let existing = repositories::sessions::find_in_progress_for_user(&mut *tx, &user.id)
                .await
                .map_err(SessionError::db("Failed to fetch active session"))?
                .ok_or_else(|| SessionError::conflict("Session could not be created, retry"))?;
            resume_or_conflict(existing, &exam.id)?
        }
    };

    tx.commit().await.map_err(SessionError::db("Failed to commit session"))?;

    if !outcome.resumed {
        metrics::counter!("exam_sessions_started_total").increment(1);
        tracing::info!(
            session_id = %outcome.session.id,
            exam_id = %exam.id,
            user_id = %user.id,
            "Exam session started"
        );
    }

    Ok(outcome)
}

pub(crate) async fn get_active(
    state: &AppState,
    user: &User,
    session_id: &str,
) -> Result<ActiveSession, SessionError> {
    let session = repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .filter(|session| access_policy::owns_session(user, session))
        .filter(|session| session.status == SessionStatus::InProgress)
        .ok_or_else(|| SessionError::not_found(ACTIVE_SESSION_NOT_FOUND))?;

    let exam = repositories::exams::find_by_id(state.db(), &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;
    let questions = catalog::load_questions(state.db(), &exam.id)
        .await
        .map_err(SessionError::db("Failed to fetch questions"))?;
    let responses = repositories::responses::list_for_session(state.db(), &session.id)
        .await
        .map_err(SessionError::db("Failed to fetch responses"))?;

    let deadline = session_timing::deadline(session.started_at, exam.time_limit_minutes);
    let remaining_seconds = session_timing::remaining_seconds(deadline, primitive_now_utc());

    Ok(ActiveSession { session, exam, questions, responses, deadline, remaining_seconds })
}

/// Upserts one answer. The session row is locked so the save cannot interleave with submit.
pub(crate) async fn save_response(
    state: &AppState,
    user: &User,
    session_id: &str,
    input: SaveResponseInput<'_>,
) -> Result<Response, SessionError> {
    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    let session = repositories::sessions::lock_for_update(&mut *tx, session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .filter(|session| access_policy::owns_session(user, session))
        .filter(|session| session.status == SessionStatus::InProgress)
        .ok_or_else(|| SessionError::not_found(ACTIVE_SESSION_NOT_FOUND))?;

    let exam = repositories::exams::find_by_id(&mut *tx, &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;

    let now = primitive_now_utc();
    let deadline = session_timing::deadline(session.started_at, exam.time_limit_minutes);
    if session_timing::is_past_grace(deadline, now, state.settings().exam().submit_grace_seconds) {
        return Err(SessionError::conflict("Session time has expired"));
    }

    let question = repositories::questions::find_in_exam(&mut *tx, &exam.id, input.question_id)
        .await
        .map_err(SessionError::db("Failed to fetch question"))?
        .ok_or_else(|| SessionError::not_found("Question not found in this exam"))?;

    if let Some(option_id) = input.selected_option_id {
        if !question.question_type.is_multiple_choice() {
            return Err(SessionError::validation(
                "selected_option_id is only valid for multiple choice questions",
            ));
        }
        let option = repositories::questions::find_option(&mut *tx, option_id)
            .await
            .map_err(SessionError::db("Failed to fetch option"))?;
        if option.map_or(true, |option| option.question_id != question.id) {
            return Err(SessionError::validation("Option does not belong to this question"));
        }
    }

    let response = repositories::responses::upsert(
        &mut *tx,
        repositories::responses::UpsertResponse {
            id: &Uuid::new_v4().to_string(),
            session_id: &session.id,
            question_id: &question.id,
            response_text: input.response_text,
            selected_option_id: input.selected_option_id,
            now,
        },
    )
    .await
    .map_err(SessionError::db("Failed to save response"))?;

    tx.commit().await.map_err(SessionError::db("Failed to commit response"))?;

    metrics::counter!("exam_responses_saved_total").increment(1);
    tracing::debug!(session_id = %session.id, question_id = %question.id, "Response saved");

    Ok(response)
}

pub(crate) async fn history(
    state: &AppState,
    user: &User,
    skip: i64,
    limit: i64,
) -> Result<Vec<HistoryRow>, SessionError> {
    repositories::sessions::list_history(state.db(), &user.id, skip.max(0), limit.clamp(1, 1000))
        .await
        .map_err(SessionError::db("Failed to fetch session history"))
}

/// Owner's view of a finished attempt, correctness included.
pub(crate) async fn result(
    state: &AppState,
    user: &User,
    session_id: &str,
) -> Result<SessionResult, SessionError> {
    let session = repositories::sessions::find_by_id(state.db(), session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .filter(|session| access_policy::owns_session(user, session))
        .ok_or_else(|| SessionError::not_found(SESSION_NOT_FOUND))?;

    if session.status == SessionStatus::InProgress {
        return Err(SessionError::conflict("Session has not been submitted yet"));
    }

    let exam = repositories::exams::find_by_id(state.db(), &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;
    let questions = catalog::load_questions(state.db(), &exam.id)
        .await
        .map_err(SessionError::db("Failed to fetch questions"))?;
    let responses = repositories::responses::list_for_session(state.db(), &session.id)
        .await
        .map_err(SessionError::db("Failed to fetch responses"))?;

    Ok(SessionResult { session, exam, questions, responses })
}
