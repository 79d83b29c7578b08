//! Server-side deadline enforcement for sessions whose client never submitted.

use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::submission_finalize;

const SWEEP_BATCH_SIZE: i64 = 200;

/// Auto-submits every in-progress session past its deadline plus grace.
///
/// Each session is finalized in its own transaction; a failure is logged and the sweep moves on.
pub(crate) async fn close_expired_sessions(state: &AppState) -> Result<u64> {
    let grace_seconds = state.settings().exam().submit_grace_seconds;
    let overdue = repositories::sessions::list_overdue_in_progress(
        state.db(),
        grace_seconds as f64,
        primitive_now_utc(),
        SWEEP_BATCH_SIZE,
    )
    .await
    .context("Failed to fetch overdue sessions")?;

    let mut closed = 0u64;
    for session_id in &overdue {
        match submission_finalize::auto_submit_overdue(state, session_id).await {
            Ok(Some(_)) => closed += 1,
            Ok(None) => {}
            Err(err) => {
                tracing::error!(session_id = %session_id, error = %err, "Failed to auto-submit session")
            }
        }
    }

    if closed > 0 {
        tracing::info!(closed_sessions = closed, "Closed expired sessions");
    }
    metrics::counter!("expired_sessions_closed_total").increment(closed);

    Ok(closed)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use super::close_expired_sessions;
    use crate::db::types::{SessionStatus, SubmitMode, UserRole};
    use crate::repositories;
    use crate::test_support;

    #[tokio::test]
    async fn sweeper_closes_only_sessions_past_grace() {
        let Some(ctx) = test_support::setup_test_context().await else { return };

        let instructor = test_support::insert_user(
            ctx.state.db(),
            "instructor",
            "Ivy Instructor",
            UserRole::Instructor,
            "pw",
        )
        .await;
        let late = test_support::insert_user(ctx.state.db(), "late", "Lee Late", UserRole::Student, "pw")
            .await;
        let fresh =
            test_support::insert_user(ctx.state.db(), "fresh", "Fay Fresh", UserRole::Student, "pw")
                .await;
        let instructor_token = test_support::bearer_token(&instructor.id, ctx.state.settings());
        let exam = test_support::seed_exam(
            &ctx,
            &instructor_token,
            &[late.id.as_str(), fresh.id.as_str()],
            10,
        )
        .await;

        let mut session_ids = Vec::new();
        for student in [&late, &fresh] {
            let token = test_support::bearer_token(&student.id, ctx.state.settings());
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    &format!("/api/v1/sessions/exams/{}/start", exam.exam_id),
                    Some(&token),
                    None,
                ))
                .await
                .expect("start");
            assert_eq!(response.status(), StatusCode::CREATED);
            let session_id = test_support::read_json(response).await["id"]
                .as_str()
                .expect("session id")
                .to_string();

            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::PUT,
                    &format!("/api/v1/sessions/{session_id}/responses"),
                    Some(&token),
                    Some(json!({
                        "question_id": exam.mc_question_id,
                        "selected_option_id": exam.correct_option_id
                    })),
                ))
                .await
                .expect("save");
            assert_eq!(response.status(), StatusCode::OK);
            session_ids.push(session_id);
        }

        test_support::backdate_session(ctx.state.db(), &session_ids[0], 16).await;

        let closed = close_expired_sessions(&ctx.state).await.expect("sweep");
        assert_eq!(closed, 1);

        let swept = repositories::sessions::find_by_id(ctx.state.db(), &session_ids[0])
            .await
            .expect("fetch")
            .expect("session");
        assert_eq!(swept.status, SessionStatus::Submitted);
        assert_eq!(swept.submit_mode, Some(SubmitMode::AutoDeadline));
        assert_eq!(swept.total_points, Some(2));
        assert!(!swept.is_late);

        let untouched = repositories::sessions::find_by_id(ctx.state.db(), &session_ids[1])
            .await
            .expect("fetch")
            .expect("session");
        assert_eq!(untouched.status, SessionStatus::InProgress);

        let closed_again = close_expired_sessions(&ctx.state).await.expect("second sweep");
        assert_eq!(closed_again, 0);
    }
}
