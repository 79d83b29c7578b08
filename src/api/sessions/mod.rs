mod handlers;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(handlers::history))
        .route("/exams/:exam_id/start", post(handlers::start_session))
        .route("/:session_id", get(handlers::get_active_session))
        .route("/:session_id/responses", put(handlers::save_response))
        .route("/:session_id/submit", post(handlers::submit_session))
        .route("/:session_id/result", get(handlers::session_result))
}
