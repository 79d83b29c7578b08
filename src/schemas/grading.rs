use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::SessionStatus;
use crate::schemas::exam::{ExamSummary, QuestionView};
use crate::schemas::session::{GradedResponseView, SessionResponse};
use crate::schemas::user::UserSummary;
use crate::services::grading::{GradeOutcome, GradingView};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[validate(range(min = 0, message = "points must be non-negative"))]
    pub(crate) points: i32,
    #[serde(default)]
    #[validate(length(max = 10000, message = "feedback must be at most 10000 characters"))]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResultResponse {
    pub(crate) success: bool,
    pub(crate) total_points: i32,
    pub(crate) session_status: SessionStatus,
    pub(crate) response: GradedResponseView,
}

impl GradeResultResponse {
    pub(crate) fn from_outcome(outcome: &GradeOutcome) -> Self {
        Self {
            success: true,
            total_points: outcome.session.total_points.unwrap_or(0),
            session_status: outcome.session.status,
            response: GradedResponseView::from_db(&outcome.response),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradingSessionResponse {
    pub(crate) session: SessionResponse,
    pub(crate) exam: ExamSummary,
    pub(crate) student: UserSummary,
    pub(crate) max_points: i64,
    pub(crate) ungraded_count: usize,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) responses: Vec<GradedResponseView>,
}

impl GradingSessionResponse {
    pub(crate) fn from_view(view: &GradingView) -> Self {
        Self {
            session: SessionResponse::from_db(&view.session),
            exam: ExamSummary::from_db(&view.exam),
            student: UserSummary::from_db(&view.student),
            max_points: view.questions.iter().map(|bundle| i64::from(bundle.question.points)).sum(),
            ungraded_count: view.responses.iter().filter(|response| response.points.is_none()).count(),
            questions: QuestionView::list(&view.questions, true),
            responses: view.responses.iter().map(GradedResponseView::from_db).collect(),
        }
    }
}
