//! Exam definitions, questions and assignments.

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, Question, QuestionOption, User};
use crate::repositories;
use crate::repositories::exams::AssignedExamRow;
use crate::repositories::sessions::ExamSessionRow;
use crate::schemas::exam::{ExamCreate, QuestionCreate};
use crate::services::access_policy;
use crate::services::error::SessionError;

#[derive(Debug, Clone)]
pub(crate) struct QuestionWithOptions {
    pub(crate) question: Question,
    pub(crate) options: Vec<QuestionOption>,
}

/// Questions in presentation order, each with its options in order.
pub(crate) async fn load_questions(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
    let questions = repositories::questions::list_for_exam(pool, exam_id).await?;
    let options = repositories::questions::list_options_for_exam(pool, exam_id).await?;
    Ok(group_options(questions, options))
}

fn group_options(
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<QuestionWithOptions> {
    let mut by_question: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id.clone()).or_default().push(option);
    }

    questions
        .into_iter()
        .map(|question| {
            let mut options = by_question.remove(&question.id).unwrap_or_default();
            options.sort_by_key(|option| option.order_index);
            QuestionWithOptions { question, options }
        })
        .collect()
}

/// Multiple choice needs at least two options and exactly one correct; other types take none.
pub(crate) fn validate_question_shape(question: &QuestionCreate) -> Result<(), String> {
    if question.question_type.is_multiple_choice() {
        if question.options.len() < 2 {
            return Err(format!(
                "Question {} must have at least two options",
                question.order_index
            ));
        }
        let correct = question.options.iter().filter(|option| option.is_correct).count();
        if correct != 1 {
            return Err(format!(
                "Question {} must have exactly one correct option",
                question.order_index
            ));
        }
    } else if !question.options.is_empty() {
        return Err(format!(
            "Question {} is not multiple choice and cannot have options",
            question.order_index
        ));
    }
    Ok(())
}

pub(crate) fn validate_exam_shape(payload: &ExamCreate) -> Result<(), String> {
    if let (Some(from), Some(to)) = (payload.available_from, payload.available_to) {
        if to <= from {
            return Err("available_to must be after available_from".to_string());
        }
    }

    let mut seen = HashSet::new();
    for question in &payload.questions {
        if !seen.insert(question.order_index) {
            return Err(format!("Duplicate order_index {}", question.order_index));
        }
        validate_question_shape(question)?;
    }
    Ok(())
}

async fn insert_question(
    conn: &mut sqlx::PgConnection,
    exam_id: &str,
    payload: &QuestionCreate,
    now: time::PrimitiveDateTime,
) -> Result<QuestionWithOptions, sqlx::Error> {
    let question = repositories::questions::create(
        &mut *conn,
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            question_text: &payload.question_text,
            question_type: payload.question_type,
            points: payload.points,
            order_index: payload.order_index,
            created_at: now,
        },
    )
    .await?;

    let mut options = Vec::with_capacity(payload.options.len());
    for (index, option) in payload.options.iter().enumerate() {
        let order_index = i32::try_from(index).unwrap_or(i32::MAX);
        options.push(
            repositories::questions::create_option(
                &mut *conn,
                &Uuid::new_v4().to_string(),
                &question.id,
                &option.option_text,
                option.is_correct,
                order_index,
            )
            .await?,
        );
    }

    Ok(QuestionWithOptions { question, options })
}

pub(crate) async fn create_exam(
    state: &AppState,
    user: &User,
    payload: &ExamCreate,
) -> Result<(Exam, Vec<QuestionWithOptions>), SessionError> {
    if !access_policy::is_instructor(user) {
        return Err(SessionError::Forbidden("Instructor access required"));
    }
    validate_exam_shape(payload).map_err(SessionError::validation)?;

    let now = primitive_now_utc();
    let exam_id = Uuid::new_v4().to_string();

    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            time_limit_minutes: payload.time_limit_minutes,
            available_from: payload.available_from,
            available_to: payload.available_to,
            created_by: &user.id,
            created_at: now,
        },
    )
    .await
    .map_err(SessionError::db("Failed to create exam"))?;

    let mut questions = Vec::with_capacity(payload.questions.len());
    let mut ordered: Vec<&QuestionCreate> = payload.questions.iter().collect();
    ordered.sort_by_key(|question| question.order_index);
    for question in ordered {
        questions.push(
            insert_question(&mut *tx, &exam.id, question, now)
                .await
                .map_err(SessionError::db("Failed to create question"))?,
        );
    }

    tx.commit().await.map_err(SessionError::db("Failed to commit exam"))?;

    tracing::info!(exam_id = %exam.id, user_id = %user.id, questions = questions.len(), "Exam created");

    Ok((exam, questions))
}

async fn load_managed_exam(
    executor: impl sqlx::PgExecutor<'_>,
    user: &User,
    exam_id: &str,
) -> Result<Exam, SessionError> {
    let exam = repositories::exams::find_by_id(executor, exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;

    if !access_policy::can_manage_exam(user, &exam) {
        return Err(SessionError::Forbidden("Only the exam creator can manage this exam"));
    }
    Ok(exam)
}

pub(crate) async fn exam_definition(
    state: &AppState,
    user: &User,
    exam_id: &str,
) -> Result<(Exam, Vec<QuestionWithOptions>), SessionError> {
    let exam = load_managed_exam(state.db(), user, exam_id).await?;
    let questions = load_questions(state.db(), &exam.id)
        .await
        .map_err(SessionError::db("Failed to fetch questions"))?;
    Ok((exam, questions))
}

pub(crate) async fn add_question(
    state: &AppState,
    user: &User,
    exam_id: &str,
    payload: &QuestionCreate,
) -> Result<QuestionWithOptions, SessionError> {
    validate_question_shape(payload).map_err(SessionError::validation)?;

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await.map_err(SessionError::db("Failed to start transaction"))?;

    let exam = repositories::exams::lock_for_update(&mut *tx, exam_id)
        .await
        .map_err(SessionError::db("Failed to fetch exam"))?
        .ok_or_else(|| SessionError::not_found("Exam not found"))?;
    if !access_policy::can_manage_exam(user, &exam) {
        return Err(SessionError::Forbidden("Only the exam creator can manage this exam"));
    }
    if exam.is_finalized {
        return Err(SessionError::conflict("Exam is finalized and can no longer be changed"));
    }

    let taken = repositories::questions::order_index_taken(&mut *tx, &exam.id, payload.order_index)
        .await
        .map_err(SessionError::db("Failed to check question order"))?;
    if taken {
        return Err(SessionError::conflict("A question with this order_index already exists"));
    }

    let question = insert_question(&mut *tx, &exam.id, payload, now)
        .await
        .map_err(SessionError::db("Failed to create question"))?;
    repositories::exams::touch(&mut *tx, &exam.id, now)
        .await
        .map_err(SessionError::db("Failed to update exam"))?;

    tx.commit().await.map_err(SessionError::db("Failed to commit question"))?;

    Ok(question)
}

pub(crate) async fn finalize_exam(
    state: &AppState,
    user: &User,
    exam_id: &str,
) -> Result<Exam, SessionError> {
    let exam = load_managed_exam(state.db(), user, exam_id).await?;
    if exam.is_finalized {
        return Ok(exam);
    }

    let questions = repositories::questions::list_for_exam(state.db(), &exam.id)
        .await
        .map_err(SessionError::db("Failed to fetch questions"))?;
    if questions.is_empty() {
        return Err(SessionError::validation("Exam must have at least one question"));
    }

    let exam = repositories::exams::mark_finalized(state.db(), &exam.id, primitive_now_utc())
        .await
        .map_err(SessionError::db("Failed to finalize exam"))?;

    tracing::info!(exam_id = %exam.id, user_id = %user.id, "Exam finalized");
    Ok(exam)
}

pub(crate) async fn assign_users(
    state: &AppState,
    user: &User,
    exam_id: &str,
    user_ids: &[String],
) -> Result<u64, SessionError> {
    let exam = load_managed_exam(state.db(), user, exam_id).await?;
    if !exam.is_finalized {
        return Err(SessionError::conflict("Exam must be finalized before assigning"));
    }

    let mut unique: Vec<String> = user_ids.iter().map(|id| id.trim().to_string()).collect();
    unique.sort();
    unique.dedup();

    let existing = repositories::users::existing_ids(state.db(), &unique)
        .await
        .map_err(SessionError::db("Failed to check users"))?;
    if existing.len() != unique.len() {
        let known: HashSet<&str> = existing.iter().map(String::as_str).collect();
        let missing: Vec<&str> =
            unique.iter().map(String::as_str).filter(|id| !known.contains(id)).collect();
        return Err(SessionError::NotFound(format!("Users not found: {}", missing.join(", "))));
    }

    let inserted =
        repositories::assignments::assign_many(state.db(), &exam.id, &unique, primitive_now_utc())
            .await
            .map_err(SessionError::db("Failed to assign exam"))?;

    tracing::info!(exam_id = %exam.id, assigned = inserted, requested = unique.len(), "Exam assigned");
    Ok(inserted)
}

pub(crate) async fn list_assigned(
    state: &AppState,
    user: &User,
) -> Result<Vec<AssignedExamRow>, SessionError> {
    repositories::exams::list_assigned_to_user(state.db(), &user.id)
        .await
        .map_err(SessionError::db("Failed to list assigned exams"))
}

pub(crate) async fn list_exam_sessions(
    state: &AppState,
    user: &User,
    exam_id: &str,
    skip: i64,
    limit: i64,
) -> Result<(Vec<ExamSessionRow>, i64), SessionError> {
    let exam = load_managed_exam(state.db(), user, exam_id).await?;
    let rows = repositories::sessions::list_for_exam(state.db(), &exam.id, skip, limit)
        .await
        .map_err(SessionError::db("Failed to list sessions"))?;
    let total = repositories::sessions::count_for_exam(state.db(), &exam.id)
        .await
        .map_err(SessionError::db("Failed to count sessions"))?;
    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionType;
    use crate::schemas::exam::OptionCreate;
    use time::macros::datetime;

    fn option(text: &str, is_correct: bool) -> OptionCreate {
        OptionCreate { option_text: text.to_string(), is_correct }
    }

    fn question(question_type: QuestionType, options: Vec<OptionCreate>) -> QuestionCreate {
        QuestionCreate {
            question_text: "Q".to_string(),
            question_type,
            points: 2,
            order_index: 0,
            options,
        }
    }

    #[test]
    fn multiple_choice_needs_exactly_one_correct_option() {
        let ok = question(
            QuestionType::MultipleChoice,
            vec![option("a", true), option("b", false)],
        );
        assert!(validate_question_shape(&ok).is_ok());

        let single = question(QuestionType::MultipleChoice, vec![option("a", true)]);
        assert!(validate_question_shape(&single).is_err());

        let two_correct =
            question(QuestionType::MultipleChoice, vec![option("a", true), option("b", true)]);
        assert!(validate_question_shape(&two_correct).is_err());

        let none_correct =
            question(QuestionType::MultipleChoice, vec![option("a", false), option("b", false)]);
        assert!(validate_question_shape(&none_correct).is_err());
    }

    #[test]
    fn free_text_questions_reject_options() {
        assert!(validate_question_shape(&question(QuestionType::Essay, vec![])).is_ok());
        let with_options = question(QuestionType::ShortAnswer, vec![option("a", true)]);
        assert!(validate_question_shape(&with_options).is_err());
    }

    #[test]
    fn exam_shape_rejects_duplicate_order_and_inverted_window() {
        let mut payload = ExamCreate {
            title: "Final".to_string(),
            description: None,
            time_limit_minutes: 30,
            available_from: Some(datetime!(2025-05-01 10:00)),
            available_to: Some(datetime!(2025-05-01 9:00)),
            questions: vec![question(QuestionType::Essay, vec![])],
        };
        assert!(validate_exam_shape(&payload).is_err());

        payload.available_to = Some(datetime!(2025-05-01 12:00));
        assert!(validate_exam_shape(&payload).is_ok());

        payload.questions.push(question(QuestionType::ShortAnswer, vec![]));
        let err = validate_exam_shape(&payload).expect_err("duplicate order index");
        assert!(err.contains("order_index"));
    }

    #[test]
    fn options_are_grouped_under_their_question_in_order() {
        let created = datetime!(2025-01-01 0:00);
        let questions = vec![
            Question {
                id: "q1".into(),
                exam_id: "e".into(),
                question_text: "first".into(),
                question_type: QuestionType::MultipleChoice,
                points: 1,
                order_index: 0,
                created_at: created,
            },
            Question {
                id: "q2".into(),
                exam_id: "e".into(),
                question_text: "second".into(),
                question_type: QuestionType::Essay,
                points: 5,
                order_index: 1,
                created_at: created,
            },
        ];
        let options = vec![
            QuestionOption {
                id: "o2".into(),
                question_id: "q1".into(),
                option_text: "b".into(),
                is_correct: false,
                order_index: 1,
            },
            QuestionOption {
                id: "o1".into(),
                question_id: "q1".into(),
                option_text: "a".into(),
                is_correct: true,
                order_index: 0,
            },
        ];

        let grouped = group_options(questions, options);

        assert_eq!(grouped.len(), 2);
        let ids: Vec<&str> = grouped[0].options.iter().map(|option| option.id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o2"]);
        assert!(grouped[1].options.is_empty());
    }
}
