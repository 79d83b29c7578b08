use sqlx::{FromRow, PgPool};

use crate::db::models::ExamSession;
use crate::db::types::{SessionStatus, SubmitMode};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, user_id, started_at, submitted_at, status, total_points, \
    is_late, submit_mode, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!("SELECT {COLUMNS} FROM exam_sessions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Serializes session creation for one user until the surrounding transaction ends.
pub(crate) async fn lock_user_sessions(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext('exam_session_user:' || $1))")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_in_progress_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions WHERE user_id = $1 AND status = $2"
    ))
    .bind(user_id)
    .bind(SessionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

/// Returns `None` when the partial unique index already holds an in-progress row for the user.
pub(crate) async fn insert_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    exam_id: &str,
    user_id: &str,
    started_at: time::PrimitiveDateTime,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "INSERT INTO exam_sessions (
            id, exam_id, user_id, started_at, status, is_late, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,FALSE,$4,$4)
        ON CONFLICT (user_id) WHERE status = 'in_progress' DO NOTHING
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(exam_id)
    .bind(user_id)
    .bind(started_at)
    .bind(SessionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) struct MarkSubmitted<'a> {
    pub(crate) id: &'a str,
    pub(crate) total_points: i32,
    pub(crate) is_late: bool,
    pub(crate) mode: SubmitMode,
    pub(crate) submitted_at: time::PrimitiveDateTime,
}

/// Conditional on the row still being in progress; `None` means someone else submitted first.
pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    params: MarkSubmitted<'_>,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "UPDATE exam_sessions
         SET status = $1, submitted_at = $2, total_points = $3, is_late = $4,
             submit_mode = $5, updated_at = $2
         WHERE id = $6 AND status = $7
         RETURNING {COLUMNS}",
    ))
    .bind(SessionStatus::Submitted)
    .bind(params.submitted_at)
    .bind(params.total_points)
    .bind(params.is_late)
    .bind(params.mode)
    .bind(params.id)
    .bind(SessionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn update_grading_rollup(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    total_points: i32,
    status: SessionStatus,
    now: time::PrimitiveDateTime,
) -> Result<ExamSession, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "UPDATE exam_sessions SET total_points = $1, status = $2, updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(total_points)
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

#[derive(Debug, FromRow)]
pub(crate) struct HistoryRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) submitted_at: Option<time::PrimitiveDateTime>,
    pub(crate) status: SessionStatus,
    pub(crate) total_points: Option<i32>,
    pub(crate) max_points: i64,
    pub(crate) is_late: bool,
}

pub(crate) async fn list_history(
    pool: &PgPool,
    user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        "SELECT s.id, s.exam_id, e.title AS exam_title, e.time_limit_minutes,
                s.started_at, s.submitted_at, s.status, s.total_points, s.is_late,
                COALESCE((SELECT SUM(q.points) FROM questions q WHERE q.exam_id = e.id), 0)::BIGINT
                    AS max_points
         FROM exam_sessions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.user_id = $1
         ORDER BY s.started_at DESC
         OFFSET $2 LIMIT $3",
    )
    .bind(user_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[derive(Debug, FromRow)]
pub(crate) struct ExamSessionRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) submitted_at: Option<time::PrimitiveDateTime>,
    pub(crate) status: SessionStatus,
    pub(crate) total_points: Option<i32>,
    pub(crate) is_late: bool,
    pub(crate) submit_mode: Option<SubmitMode>,
}

pub(crate) async fn list_for_exam(
    pool: &PgPool,
    exam_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSessionRow>(
        "SELECT s.id, s.user_id, u.username, u.full_name, s.started_at, s.submitted_at,
                s.status, s.total_points, s.is_late, s.submit_mode
         FROM exam_sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.exam_id = $1
         ORDER BY s.started_at DESC
         OFFSET $2 LIMIT $3",
    )
    .bind(exam_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_for_exam(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_sessions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

/// In-progress sessions whose deadline plus `grace_seconds` lies before `now`, oldest first.
pub(crate) async fn list_overdue_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    grace_seconds: f64,
    now: time::PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT s.id
         FROM exam_sessions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.status = $1
           AND s.started_at + make_interval(mins => e.time_limit_minutes, secs => $2) < $3
         ORDER BY s.started_at
         LIMIT $4",
    )
    .bind(SessionStatus::InProgress)
    .bind(grace_seconds)
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}
