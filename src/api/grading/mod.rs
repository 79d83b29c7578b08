mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/responses/:response_id", post(handlers::grade_response))
        .route("/sessions/:session_id", get(handlers::session_for_grading))
}

#[cfg(test)]
mod tests;
