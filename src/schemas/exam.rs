use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Exam;
use crate::db::types::{QuestionType, SessionStatus, SubmitMode};
use crate::repositories::exams::AssignedExamRow;
use crate::repositories::sessions::ExamSessionRow;
use crate::schemas::deserialize_option_datetime_flexible;
use crate::services::catalog::QuestionWithOptions;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionCreate {
    #[serde(alias = "optionText")]
    #[validate(length(min = 1, message = "option_text must not be empty"))]
    pub(crate) option_text: String,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[validate(range(min = 1, message = "points must be positive"))]
    pub(crate) points: i32,
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: i32,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) options: Vec<OptionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 255, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: i32,
    #[serde(default, alias = "availableFrom", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) available_from: Option<PrimitiveDateTime>,
    #[serde(default, alias = "availableTo", deserialize_with = "deserialize_option_datetime_flexible")]
    pub(crate) available_to: Option<PrimitiveDateTime>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignRequest {
    #[serde(alias = "userIds")]
    #[validate(length(min = 1, max = 1000, message = "user_ids must contain 1 to 1000 ids"))]
    pub(crate) user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionView {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) order_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) order_index: i32,
    pub(crate) options: Vec<OptionView>,
}

impl QuestionView {
    /// `reveal_correct` controls whether option correctness is included at all.
    pub(crate) fn from_bundle(bundle: &QuestionWithOptions, reveal_correct: bool) -> Self {
        Self {
            id: bundle.question.id.clone(),
            question_text: bundle.question.question_text.clone(),
            question_type: bundle.question.question_type,
            points: bundle.question.points,
            order_index: bundle.question.order_index,
            options: bundle
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    option_text: option.option_text.clone(),
                    order_index: option.order_index,
                    is_correct: reveal_correct.then_some(option.is_correct),
                })
                .collect(),
        }
    }

    pub(crate) fn list(bundles: &[QuestionWithOptions], reveal_correct: bool) -> Vec<Self> {
        bundles.iter().map(|bundle| Self::from_bundle(bundle, reveal_correct)).collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: i32,
}

impl ExamSummary {
    pub(crate) fn from_db(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            description: exam.description.clone(),
            time_limit_minutes: exam.time_limit_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: i32,
    pub(crate) available_from: Option<String>,
    pub(crate) available_to: Option<String>,
    pub(crate) is_finalized: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) max_points: i64,
    pub(crate) questions: Vec<QuestionView>,
}

impl ExamResponse {
    pub(crate) fn from_parts(exam: Exam, questions: &[QuestionWithOptions]) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            time_limit_minutes: exam.time_limit_minutes,
            available_from: exam.available_from.map(format_primitive),
            available_to: exam.available_to.map(format_primitive),
            is_finalized: exam.is_finalized,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            max_points: questions.iter().map(|bundle| i64::from(bundle.question.points)).sum(),
            questions: QuestionView::list(questions, true),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResult {
    pub(crate) exam_id: String,
    pub(crate) requested: usize,
    pub(crate) newly_assigned: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignedExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: i32,
    pub(crate) available_from: Option<String>,
    pub(crate) available_to: Option<String>,
    pub(crate) assigned_at: String,
    pub(crate) latest_session_id: Option<String>,
    pub(crate) latest_session_status: Option<SessionStatus>,
}

impl AssignedExamResponse {
    pub(crate) fn from_row(row: AssignedExamRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            time_limit_minutes: row.time_limit_minutes,
            available_from: row.available_from.map(format_primitive),
            available_to: row.available_to.map(format_primitive),
            assigned_at: format_primitive(row.assigned_at),
            latest_session_id: row.latest_session_id,
            latest_session_status: row.latest_session_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSessionListItem {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) status: SessionStatus,
    pub(crate) total_points: Option<i32>,
    pub(crate) is_late: bool,
    pub(crate) submit_mode: Option<SubmitMode>,
}

impl ExamSessionListItem {
    pub(crate) fn from_row(row: ExamSessionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            full_name: row.full_name,
            started_at: format_primitive(row.started_at),
            submitted_at: row.submitted_at.map(format_primitive),
            status: row.status,
            total_points: row.total_points,
            is_late: row.is_late,
            submit_mode: row.submit_mode,
        }
    }
}
