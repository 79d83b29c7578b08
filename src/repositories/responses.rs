use sqlx::FromRow;

use crate::db::models::Response;
use crate::db::types::QuestionType;

pub(crate) const COLUMNS: &str = "\
    id, session_id, question_id, response_text, selected_option_id, points, \
    graded_by, graded_at, feedback, created_at, updated_at";

pub(crate) struct UpsertResponse<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) response_text: Option<&'a str>,
    pub(crate) selected_option_id: Option<&'a str>,
    pub(crate) now: time::PrimitiveDateTime,
}

/// One row per (session, question); a repeated save overwrites the answer fields.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertResponse<'_>,
) -> Result<Response, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!(
        "INSERT INTO responses (
            id, session_id, question_id, response_text, selected_option_id, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        ON CONFLICT (session_id, question_id) DO UPDATE
        SET response_text = EXCLUDED.response_text,
            selected_option_id = EXCLUDED.selected_option_id,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.session_id)
    .bind(params.question_id)
    .bind(params.response_text)
    .bind(params.selected_option_id)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<Response>, sqlx::Error> {
    sqlx::query_as::<_, Response>(
        "SELECT r.id, r.session_id, r.question_id, r.response_text, r.selected_option_id,
                r.points, r.graded_by, r.graded_at, r.feedback, r.created_at, r.updated_at
         FROM responses r
         JOIN questions q ON q.id = r.question_id
         WHERE r.session_id = $1
         ORDER BY q.order_index",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Response>, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!("SELECT {COLUMNS} FROM responses WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// A response joined with what the autograder needs to score it.
#[derive(Debug, FromRow)]
pub(crate) struct ScoringRow {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) question_points: i32,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) option_is_correct: Option<bool>,
    pub(crate) points: Option<i32>,
}

pub(crate) async fn list_for_scoring(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<ScoringRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoringRow>(
        "SELECT r.id, q.question_type, q.points AS question_points, r.selected_option_id,
                o.is_correct AS option_is_correct, r.points
         FROM responses r
         JOIN questions q ON q.id = r.question_id
         LEFT JOIN question_options o ON o.id = r.selected_option_id
         WHERE r.session_id = $1",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn set_points(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    points: i32,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE responses SET points = $1, updated_at = $2 WHERE id = $3")
        .bind(points)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) struct GradeResponse<'a> {
    pub(crate) id: &'a str,
    pub(crate) points: i32,
    pub(crate) feedback: Option<&'a str>,
    pub(crate) graded_by: &'a str,
    pub(crate) graded_at: time::PrimitiveDateTime,
}

pub(crate) async fn grade(
    executor: impl sqlx::PgExecutor<'_>,
    params: GradeResponse<'_>,
) -> Result<Response, sqlx::Error> {
    sqlx::query_as::<_, Response>(&format!(
        "UPDATE responses
         SET points = $1, feedback = $2, graded_by = $3, graded_at = $4, updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.points)
    .bind(params.feedback)
    .bind(params.graded_by)
    .bind(params.graded_at)
    .bind(params.id)
    .fetch_one(executor)
    .await
}

#[derive(Debug, FromRow)]
pub(crate) struct SessionTotals {
    pub(crate) total_points: i64,
    pub(crate) ungraded: i64,
}

pub(crate) async fn totals_for_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<SessionTotals, sqlx::Error> {
    sqlx::query_as::<_, SessionTotals>(
        "SELECT COALESCE(SUM(points), 0)::BIGINT AS total_points,
                COUNT(*) FILTER (WHERE points IS NULL) AS ungraded
         FROM responses
         WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_one(executor)
    .await
}
