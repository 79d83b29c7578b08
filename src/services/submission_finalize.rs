use time::PrimitiveDateTime;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, ExamSession, User};
use crate::db::types::{SessionStatus, SubmitMode};
use crate::repositories;
use crate::services::access_policy;
use crate::services::autograder::{self, ObjectiveAnswer};
use crate::services::error::SessionError;
use crate::services::session_timing;

#[derive(Debug, Clone, Copy)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    AutoDeadline,
}

impl FinalizeMode {
    fn submit_mode(self) -> SubmitMode {
        match self {
            Self::ManualSubmit => SubmitMode::Manual,
            Self::AutoDeadline => SubmitMode::AutoDeadline,
        }
    }
}

/// Autogrades and closes a session whose row the caller has locked.
///
/// Returns `None` when the conditional update finds the session no longer in progress.
async fn finalize_locked(
    conn: &mut sqlx::PgConnection,
    session: &ExamSession,
    exam: &Exam,
    mode: FinalizeMode,
    grace_seconds: u64,
    now: PrimitiveDateTime,
) -> Result<Option<ExamSession>, sqlx::Error> {
    let rows = repositories::responses::list_for_scoring(&mut *conn, &session.id).await?;

    let mut points = Vec::with_capacity(rows.len());
    for row in &rows {
        let scored = autograder::score(ObjectiveAnswer {
            question_type: row.question_type,
            question_points: row.question_points,
            selected_option_id: row.selected_option_id.as_deref(),
            option_is_correct: row.option_is_correct,
        });
        if let Some(value) = scored {
            if row.points != Some(value) {
                repositories::responses::set_points(&mut *conn, &row.id, value, now).await?;
            }
        }
        points.push(scored.or(row.points));
    }

    let total_points = autograder::total_points(points);
    let deadline = session_timing::deadline(session.started_at, exam.time_limit_minutes);
    let is_late = session_timing::is_past_grace(deadline, now, grace_seconds);

    repositories::sessions::mark_submitted(
        &mut *conn,
        repositories::sessions::MarkSubmitted {
            id: &session.id,
            total_points,
            is_late,
            mode: mode.submit_mode(),
            submitted_at: now,
        },
    )
    .await
}

fn record_submission(session: &ExamSession, mode: FinalizeMode) {
    metrics::counter!("exam_sessions_submitted_total", "mode" => mode.submit_mode().as_str())
        .increment(1);
    if session.is_late {
        metrics::counter!("exam_sessions_late_total").increment(1);
    }
    tracing::info!(
        session_id = %session.id,
        exam_id = %session.exam_id,
        user_id = %session.user_id,
        total_points = session.total_points.unwrap_or(0),
        is_late = session.is_late,
        mode = mode.submit_mode().as_str(),
        "Exam session submitted"
    );
}

/// Student-initiated submit. A second call finds no active session.
pub(crate) async fn submit(
    state: &AppState,
    user: &User,
    session_id: &str,
) -> Result<ExamSession, SessionError> {
    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    let session = repositories::sessions::lock_for_update(&mut *tx, session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .filter(|session| access_policy::owns_session(user, session))
        .filter(|session| session.status == SessionStatus::InProgress)
        .ok_or_else(|| SessionError::not_found("No active session to submit"))?;

    let exam = repositories::exams::find_by_id(&mut *tx, &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;

    let submitted = finalize_locked(
        &mut *tx,
        &session,
        &exam,
        FinalizeMode::ManualSubmit,
        state.settings().exam().submit_grace_seconds,
        primitive_now_utc(),
    )
    .await
    .map_err(SessionError::db("Failed to submit session"))?
    .ok_or_else(|| SessionError::not_found("No active session to submit"))?;

    tx.commit().await.map_err(SessionError::db("Failed to commit submission"))?;

    record_submission(&submitted, FinalizeMode::ManualSubmit);
    Ok(submitted)
}

/// Server-side close of an overdue session. `Ok(None)` when it was already submitted
/// or is not yet past its grace period.
pub(crate) async fn auto_submit_overdue(
    state: &AppState,
    session_id: &str,
) -> Result<Option<ExamSession>, SessionError> {
    let grace_seconds = state.settings().exam().submit_grace_seconds;
    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    let Some(session) = repositories::sessions::lock_for_update(&mut *tx, session_id)
        .await
        .map_err(SessionError::db("Failed to fetch session"))?
        .filter(|session| session.status == SessionStatus::InProgress)
    else {
        return Ok(None);
    };

    let exam = repositories::exams::find_by_id(&mut *tx, &session.exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;

    let now = primitive_now_utc();
    let deadline = session_timing::deadline(session.started_at, exam.time_limit_minutes);
    if !session_timing::is_past_grace(deadline, now, grace_seconds) {
        return Ok(None);
    }

    // The sweeper closes sessions at the grace boundary, so they are not marked late.
    let submitted =
        finalize_locked(&mut *tx, &session, &exam, FinalizeMode::AutoDeadline, u64::MAX, now)
            .await
            .map_err(SessionError::db("Failed to auto-submit session"))?;

    tx.commit().await.map_err(SessionError::db("Failed to commit auto-submit"))?;

    if let Some(submitted) = &submitted {
        record_submission(submitted, FinalizeMode::AutoDeadline);
    }
    Ok(submitted)
}
