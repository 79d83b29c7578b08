use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{ExamSession, Response};
use crate::db::types::{SessionStatus, SubmitMode};
use crate::repositories::sessions::HistoryRow;
use crate::schemas::exam::{ExamSummary, QuestionView};
use crate::services::sessions::{ActiveSession, SessionResult};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveResponseRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "responseText")]
    #[validate(length(max = 100000, message = "response_text is too long"))]
    pub(crate) response_text: Option<String>,
    #[serde(default)]
    #[serde(alias = "selectedOptionId")]
    pub(crate) selected_option_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) status: SessionStatus,
    pub(crate) total_points: Option<i32>,
    pub(crate) is_late: bool,
    pub(crate) submit_mode: Option<SubmitMode>,
}

impl SessionResponse {
    pub(crate) fn from_db(session: &ExamSession) -> Self {
        Self {
            id: session.id.clone(),
            exam_id: session.exam_id.clone(),
            user_id: session.user_id.clone(),
            started_at: format_primitive(session.started_at),
            submitted_at: session.submitted_at.map(format_primitive),
            status: session.status,
            total_points: session.total_points,
            is_late: session.is_late,
            submit_mode: session.submit_mode,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SavedResponseView {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) response_text: Option<String>,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) updated_at: String,
}

impl SavedResponseView {
    pub(crate) fn from_db(response: &Response) -> Self {
        Self {
            id: response.id.clone(),
            question_id: response.question_id.clone(),
            response_text: response.response_text.clone(),
            selected_option_id: response.selected_option_id.clone(),
            updated_at: format_primitive(response.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradedResponseView {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) response_text: Option<String>,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) points: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: Option<String>,
}

impl GradedResponseView {
    pub(crate) fn from_db(response: &Response) -> Self {
        Self {
            id: response.id.clone(),
            question_id: response.question_id.clone(),
            response_text: response.response_text.clone(),
            selected_option_id: response.selected_option_id.clone(),
            points: response.points,
            feedback: response.feedback.clone(),
            graded_by: response.graded_by.clone(),
            graded_at: response.graded_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveSessionResponse {
    pub(crate) session: SessionResponse,
    pub(crate) exam: ExamSummary,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) responses: Vec<SavedResponseView>,
    pub(crate) deadline: String,
    pub(crate) time_remaining_seconds: i64,
    pub(crate) auto_save_interval_seconds: u64,
}

impl ActiveSessionResponse {
    pub(crate) fn from_active(active: &ActiveSession, auto_save_interval_seconds: u64) -> Self {
        Self {
            session: SessionResponse::from_db(&active.session),
            exam: ExamSummary::from_db(&active.exam),
            questions: QuestionView::list(&active.questions, false),
            responses: active.responses.iter().map(SavedResponseView::from_db).collect(),
            deadline: format_primitive(active.deadline),
            time_remaining_seconds: active.remaining_seconds,
            auto_save_interval_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveResponseResult {
    pub(crate) success: bool,
    pub(crate) response: SavedResponseView,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) success: bool,
    pub(crate) total_points: i32,
    pub(crate) status: SessionStatus,
    pub(crate) is_late: bool,
    pub(crate) submitted_at: Option<String>,
}

impl SubmitResponse {
    pub(crate) fn from_db(session: &ExamSession) -> Self {
        Self {
            success: true,
            total_points: session.total_points.unwrap_or(0),
            status: session.status,
            is_late: session.is_late,
            submitted_at: session.submitted_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryExam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) time_limit_minutes: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryItem {
    pub(crate) id: String,
    pub(crate) exam: HistoryExam,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) status: SessionStatus,
    pub(crate) total_points: Option<i32>,
    pub(crate) max_points: i64,
    pub(crate) is_late: bool,
}

impl HistoryItem {
    pub(crate) fn from_row(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            exam: HistoryExam {
                id: row.exam_id,
                title: row.exam_title,
                time_limit_minutes: row.time_limit_minutes,
            },
            started_at: format_primitive(row.started_at),
            submitted_at: row.submitted_at.map(format_primitive),
            status: row.status,
            total_points: row.total_points,
            max_points: row.max_points,
            is_late: row.is_late,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResultResponse {
    pub(crate) session: SessionResponse,
    pub(crate) exam: ExamSummary,
    pub(crate) max_points: i64,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) responses: Vec<GradedResponseView>,
}

impl SessionResultResponse {
    pub(crate) fn from_result(result: &SessionResult) -> Self {
        Self {
            session: SessionResponse::from_db(&result.session),
            exam: ExamSummary::from_db(&result.exam),
            max_points: result
                .questions
                .iter()
                .map(|bundle| i64::from(bundle.question.points))
                .sum(),
            questions: QuestionView::list(&result.questions, true),
            responses: result.responses.iter().map(GradedResponseView::from_db).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_request_accepts_either_field_style() {
        let snake: SaveResponseRequest = serde_json::from_value(serde_json::json!({
            "question_id": "q-1",
            "response_text": "draft"
        }))
        .expect("snake case");
        let camel: SaveResponseRequest = serde_json::from_value(serde_json::json!({
            "questionId": "q-1",
            "selectedOptionId": "opt-1"
        }))
        .expect("camel case");

        assert_eq!(snake.response_text.as_deref(), Some("draft"));
        assert!(snake.selected_option_id.is_none());
        assert_eq!(camel.selected_option_id.as_deref(), Some("opt-1"));
    }

    #[test]
    fn empty_question_id_fails_validation() {
        let payload: SaveResponseRequest =
            serde_json::from_value(serde_json::json!({ "question_id": "" })).expect("payload");
        assert!(payload.validate().is_err());
    }
}
