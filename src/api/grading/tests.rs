use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support::{self, TestContext};

struct Submitted {
    instructor_token: String,
    session_id: String,
    essay_response_id: String,
}

async fn submitted_session(ctx: &TestContext, submit: bool) -> Submitted {
    let instructor = test_support::insert_user(
        ctx.state.db(),
        "grader",
        "Gail Grader",
        UserRole::Instructor,
        "pw",
    )
    .await;
    let student =
        test_support::insert_user(ctx.state.db(), "student", "Sam Student", UserRole::Student, "pw")
            .await;
    let instructor_token = test_support::bearer_token(&instructor.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let exam = test_support::seed_exam(ctx, &instructor_token, &[student.id.as_str()], 60).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/exams/{}/start", exam.exam_id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("start");
    let session_id =
        test_support::read_json(response).await["id"].as_str().expect("session id").to_string();

    for body in [
        json!({ "question_id": exam.mc_question_id, "selected_option_id": exam.correct_option_id }),
        json!({ "question_id": exam.essay_question_id, "response_text": "a(b + c) = ab + ac" }),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/sessions/{session_id}/responses"),
                Some(&student_token),
                Some(body),
            ))
            .await
            .expect("save");
        assert_eq!(response.status(), StatusCode::OK);
    }

    if submit {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/sessions/{session_id}/submit"),
                Some(&student_token),
                None,
            ))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let essay_response_id: String = sqlx::query_scalar(
        "SELECT id FROM responses WHERE session_id = $1 AND question_id = $2",
    )
    .bind(&session_id)
    .bind(&exam.essay_question_id)
    .fetch_one(ctx.state.db())
    .await
    .expect("essay response");

    Submitted { instructor_token, session_id, essay_response_id }
}

async fn grade(
    ctx: &TestContext,
    token: &str,
    response_id: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/grading/responses/{response_id}"),
            Some(token),
            Some(body),
        ))
        .await
        .expect("grade");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn grading_last_response_marks_session_graded() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fx = submitted_session(&ctx, true).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/grading/sessions/{}", fx.session_id),
            Some(&fx.instructor_token),
            None,
        ))
        .await
        .expect("grading view");
    let status = response.status();
    let view = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {view}");
    assert_eq!(view["ungraded_count"], 1);
    assert_eq!(view["student"]["username"], "student");
    assert_eq!(view["session"]["total_points"], 2);

    let (status, graded) = grade(
        &ctx,
        &fx.instructor_token,
        &fx.essay_response_id,
        json!({ "points": 4, "feedback": "Clear, missing an example" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["total_points"], 6);
    assert_eq!(graded["session_status"], "graded");
    assert_eq!(graded["response"]["feedback"], "Clear, missing an example");

    let (status, regraded) =
        grade(&ctx, &fx.instructor_token, &fx.essay_response_id, json!({ "points": 5 })).await;
    assert_eq!(status, StatusCode::OK, "response: {regraded}");
    assert_eq!(regraded["total_points"], 7);
    assert_eq!(regraded["session_status"], "graded");
}

#[tokio::test]
async fn points_above_question_maximum_are_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fx = submitted_session(&ctx, true).await;

    let (status, body) =
        grade(&ctx, &fx.instructor_token, &fx.essay_response_id, json!({ "points": 6 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
async fn in_progress_sessions_cannot_be_graded() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fx = submitted_session(&ctx, false).await;

    let (status, body) =
        grade(&ctx, &fx.instructor_token, &fx.essay_response_id, json!({ "points": 3 })).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
}

#[tokio::test]
async fn other_instructors_cannot_grade() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let fx = submitted_session(&ctx, true).await;
    let stranger = test_support::insert_user(
        ctx.state.db(),
        "stranger",
        "Stan Stranger",
        UserRole::Instructor,
        "pw",
    )
    .await;
    let token = test_support::bearer_token(&stranger.id, ctx.state.settings());

    let (status, _) = grade(&ctx, &token, &fx.essay_response_id, json!({ "points": 3 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin =
        test_support::insert_user(ctx.state.db(), "root", "Ada Admin", UserRole::Admin, "pw").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let (status, body) = grade(&ctx, &token, &fx.essay_response_id, json!({ "points": 3 })).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
}
