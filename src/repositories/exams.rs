use sqlx::{FromRow, PgPool};

use crate::db::models::Exam;
use crate::db::types::SessionStatus;

pub(crate) const COLUMNS: &str = "\
    id, title, description, time_limit_minutes, available_from, available_to, \
    is_finalized, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) time_limit_minutes: i32,
    pub(crate) available_from: Option<time::PrimitiveDateTime>,
    pub(crate) available_to: Option<time::PrimitiveDateTime>,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, time_limit_minutes, available_from, available_to,
            is_finalized, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,FALSE,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.time_limit_minutes)
    .bind(params.available_from)
    .bind(params.available_to)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn mark_finalized(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET is_finalized = TRUE, updated_at = $1 WHERE id = $2 RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn touch(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
pub(crate) struct AssignedExamRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: i32,
    pub(crate) available_from: Option<time::PrimitiveDateTime>,
    pub(crate) available_to: Option<time::PrimitiveDateTime>,
    pub(crate) assigned_at: time::PrimitiveDateTime,
    pub(crate) latest_session_id: Option<String>,
    pub(crate) latest_session_status: Option<SessionStatus>,
}

pub(crate) async fn list_assigned_to_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<AssignedExamRow>, sqlx::Error> {
    sqlx::query_as::<_, AssignedExamRow>(
        "SELECT e.id, e.title, e.description, e.time_limit_minutes,
                e.available_from, e.available_to, a.assigned_at,
                latest.id AS latest_session_id, latest.status AS latest_session_status
         FROM exam_assignments a
         JOIN exams e ON e.id = a.exam_id
         LEFT JOIN LATERAL (
             SELECT s.id, s.status FROM exam_sessions s
             WHERE s.exam_id = e.id AND s.user_id = a.user_id
             ORDER BY s.started_at DESC
             LIMIT 1
         ) latest ON TRUE
         WHERE a.user_id = $1 AND e.is_finalized
         ORDER BY a.assigned_at DESC, e.title",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
