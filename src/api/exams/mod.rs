mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam))
        .route("/assigned", get(handlers::list_assigned_exams))
        .route("/:exam_id", get(handlers::get_exam))
        .route("/:exam_id/questions", post(handlers::add_question))
        .route("/:exam_id/finalize", post(handlers::finalize_exam))
        .route("/:exam_id/assignments", post(handlers::assign_exam))
        .route("/:exam_id/sessions", get(handlers::list_exam_sessions))
}

#[cfg(test)]
mod tests;
