use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn instructor_can_create_finalize_and_assign_exam() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let instructor = test_support::insert_user(
        ctx.state.db(),
        "instructor01",
        "Ivy Instructor",
        UserRole::Instructor,
        "instructor-pass",
    )
    .await;
    let student =
        test_support::insert_user(ctx.state.db(), "student01", "Sam Student", UserRole::Student, "pw")
            .await;
    let token = test_support::bearer_token(&instructor.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(test_support::exam_payload(60)),
        ))
        .await
        .expect("create exam");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["is_finalized"], false);
    assert_eq!(created["max_points"], 7);
    assert_eq!(created["questions"].as_array().unwrap().len(), 2);
    let exam_id = created["id"].as_str().expect("exam id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/assignments"),
            Some(&token),
            Some(json!({ "user_ids": [student.id] })),
        ))
        .await
        .expect("assign before finalize");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/finalize"),
            Some(&token),
            None,
        ))
        .await
        .expect("finalize");
    let status = response.status();
    let finalized = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {finalized}");
    assert_eq!(finalized["is_finalized"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{exam_id}/assignments"),
            Some(&token),
            Some(json!({ "user_ids": [student.id, student.id] })),
        ))
        .await
        .expect("assign");
    let status = response.status();
    let assigned = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {assigned}");
    assert_eq!(assigned["newly_assigned"], 1);

    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams/assigned",
            Some(&student_token),
            None,
        ))
        .await
        .expect("list assigned");
    let status = response.status();
    let listed = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {listed}");
    let items = listed.as_array().expect("assigned list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], exam_id.as_str());
    assert!(items[0]["latest_session_id"].is_null());
}

#[tokio::test]
async fn finalized_exam_rejects_new_questions() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let instructor = test_support::insert_user(
        ctx.state.db(),
        "instructor02",
        "Ivy Instructor",
        UserRole::Instructor,
        "pw",
    )
    .await;
    let token = test_support::bearer_token(&instructor.id, ctx.state.settings());
    let seeded = test_support::seed_exam(&ctx, &token, &[], 30).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/{}/questions", seeded.exam_id),
            Some(&token),
            Some(json!({
                "question_text": "Late addition",
                "question_type": "short_answer",
                "points": 1,
                "order_index": 5
            })),
        ))
        .await
        .expect("add question");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn multiple_choice_without_correct_option_is_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let instructor = test_support::insert_user(
        ctx.state.db(),
        "instructor03",
        "Ivy Instructor",
        UserRole::Instructor,
        "pw",
    )
    .await;
    let token = test_support::bearer_token(&instructor.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(json!({
                "title": "Broken",
                "time_limit_minutes": 10,
                "questions": [{
                    "question_text": "Pick one",
                    "question_type": "multiple_choice",
                    "points": 1,
                    "order_index": 0,
                    "options": [
                        {"option_text": "a"},
                        {"option_text": "b"}
                    ]
                }]
            })),
        ))
        .await
        .expect("create exam");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn students_cannot_create_exams() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let student =
        test_support::insert_user(ctx.state.db(), "student02", "Sam Student", UserRole::Student, "pw")
            .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(test_support::exam_payload(30)),
        ))
        .await
        .expect("create exam");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
