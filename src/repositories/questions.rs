use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionType;

const COLUMNS: &str = "id, exam_id, question_text, question_type, points, order_index, created_at";
const OPTION_COLUMNS: &str = "id, question_id, option_text, is_correct, order_index";

pub(crate) async fn list_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY order_index"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

/// Looks a question up scoped to its exam, so ids from other exams read as absent.
pub(crate) async fn find_in_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    question_id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE id = $1 AND exam_id = $2"
    ))
    .bind(question_id)
    .bind(exam_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn order_index_taken(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    order_index: i32,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM questions WHERE exam_id = $1 AND order_index = $2)",
    )
    .bind(exam_id)
    .bind(order_index)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) order_index: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, question_text, question_type, points, order_index, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.question_text)
    .bind(params.question_type)
    .bind(params.points)
    .bind(params.order_index)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn create_option(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    question_id: &str,
    option_text: &str,
    is_correct: bool,
    order_index: i32,
) -> Result<QuestionOption, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "INSERT INTO question_options (id, question_id, option_text, is_correct, order_index)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {OPTION_COLUMNS}",
    ))
    .bind(id)
    .bind(question_id)
    .bind(option_text)
    .bind(is_correct)
    .bind(order_index)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_options_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(
        "SELECT o.id, o.question_id, o.option_text, o.is_correct, o.order_index
         FROM question_options o
         JOIN questions q ON q.id = o.question_id
         WHERE q.exam_id = $1
         ORDER BY q.order_index, o.order_index",
    )
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_option(
    executor: impl sqlx::PgExecutor<'_>,
    option_id: &str,
) -> Result<Option<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options WHERE id = $1"
    ))
    .bind(option_id)
    .fetch_optional(executor)
    .await
}
