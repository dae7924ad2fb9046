//! Integration tests for the submission intake and polling endpoints.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{build_test_app, expect_json, get, post_json};
use lemma_core::memory::MemoryStore;
use lemma_core::status::SubmissionStatus;
use lemma_core::store::SubmissionStore;
use lemma_core::submission::Problem;
use lemma_core::verdict::{CheckStatus, Evaluation, Verdict, VerificationReport};
use uuid::Uuid;

fn store_with_problem() -> (Arc<MemoryStore>, Uuid) {
    let store = Arc::new(MemoryStore::new());
    let problem_id = Uuid::now_v7();
    store.insert_problem(Problem {
        id: problem_id,
        title: "Commutativity of addition".to_string(),
        statement_latex: "\\forall a b, a + b = b + a".to_string(),
    });
    (store, problem_id)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_submission_returns_201_pending() {
    let (store, problem_id) = store_with_problem();
    let app = build_test_app(Arc::clone(&store));

    let response = post_json(
        app,
        "/api/v1/submissions",
        serde_json::json!({
            "problem_id": problem_id,
            "proof_latex": "By symmetry of the definition of addition."
        }),
    )
    .await;

    let json = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["progress"], 0);
    assert!(json["data"]["evaluated_at"].is_null());

    // The row really is in the store.
    let id: Uuid = json["data"]["id"].as_str().unwrap().parse().unwrap();
    let submission = store.find(id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Pending);
}

#[tokio::test]
async fn create_with_unknown_problem_returns_404() {
    let (store, _) = store_with_problem();
    let app = build_test_app(store);

    let response = post_json(
        app,
        "/api/v1/submissions",
        serde_json::json!({
            "problem_id": Uuid::now_v7(),
            "proof_latex": "A proof for a problem that does not exist."
        }),
    )
    .await;

    let json = expect_json(response, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn create_with_empty_proof_returns_400() {
    let (store, problem_id) = store_with_problem();
    let app = build_test_app(store);

    let response = post_json(
        app,
        "/api/v1/submissions",
        serde_json::json!({
            "problem_id": problem_id,
            "proof_latex": ""
        }),
    )
    .await;

    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Status polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_status_unknown_id_returns_404() {
    let (store, _) = store_with_problem();
    let app = build_test_app(store);

    let response = get(app, &format!("/api/v1/submissions/{}", Uuid::now_v7())).await;
    let json = expect_json(response, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn status_reflects_pipeline_progress() {
    let (store, problem_id) = store_with_problem();

    let app = build_test_app(Arc::clone(&store));
    let response = post_json(
        app,
        "/api/v1/submissions",
        serde_json::json!({
            "problem_id": problem_id,
            "proof_latex": "Induction."
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::CREATED).await;
    let id: Uuid = json["data"]["id"].as_str().unwrap().parse().unwrap();

    // Simulate the worker picking the submission up.
    store
        .claim_next("worker-0", Duration::from_secs(60))
        .await
        .unwrap()
        .unwrap();
    store
        .transition(
            id,
            SubmissionStatus::Claimed,
            SubmissionStatus::Converting,
            25,
        )
        .await
        .unwrap();

    let app = build_test_app(Arc::clone(&store));
    let response = get(app, &format!("/api/v1/submissions/{id}")).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"]["status"], "converting");
    assert_eq!(json["data"]["progress"], 25);
}

// ---------------------------------------------------------------------------
// Result polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn result_before_terminal_returns_409_not_ready() {
    let (store, problem_id) = store_with_problem();

    let app = build_test_app(Arc::clone(&store));
    let response = post_json(
        app,
        "/api/v1/submissions",
        serde_json::json!({
            "problem_id": problem_id,
            "proof_latex": "Still thinking."
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::CREATED).await;
    let id: Uuid = json["data"]["id"].as_str().unwrap().parse().unwrap();

    let app = build_test_app(store);
    let response = get(app, &format!("/api/v1/submissions/{id}/result")).await;
    let json = expect_json(response, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "NOT_READY");
}

#[tokio::test]
async fn result_unknown_id_returns_404() {
    let (store, _) = store_with_problem();
    let app = build_test_app(store);

    let response = get(
        app,
        &format!("/api/v1/submissions/{}/result", Uuid::now_v7()),
    )
    .await;
    let json = expect_json(response, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn result_after_completion_returns_verdict() {
    let (store, problem_id) = store_with_problem();

    let app = build_test_app(Arc::clone(&store));
    let response = post_json(
        app,
        "/api/v1/submissions",
        serde_json::json!({
            "problem_id": problem_id,
            "proof_latex": "Complete proof."
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::CREATED).await;
    let id: Uuid = json["data"]["id"].as_str().unwrap().parse().unwrap();

    // Drive the submission to completion the way a worker would.
    store
        .claim_next("worker-0", Duration::from_secs(60))
        .await
        .unwrap()
        .unwrap();
    store
        .transition(
            id,
            SubmissionStatus::Claimed,
            SubmissionStatus::Converting,
            25,
        )
        .await
        .unwrap();
    store
        .transition(
            id,
            SubmissionStatus::Converting,
            SubmissionStatus::Verifying,
            50,
        )
        .await
        .unwrap();
    store
        .complete(
            id,
            &Evaluation {
                verdict: Verdict::Accepted,
                report: Some(VerificationReport {
                    is_valid: true,
                    status: CheckStatus::Proved,
                    diagnostics: vec![],
                    open_goals: vec![],
                }),
                feedback: vec!["The proof was converted and verified successfully.".to_string()],
            },
        )
        .await
        .unwrap();

    let app = build_test_app(Arc::clone(&store));
    let response = get(app, &format!("/api/v1/submissions/{id}/result")).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"]["verdict"], "accepted");
    assert_eq!(json["data"]["report"]["status"], "proved");
    assert!(json["data"]["feedback"].is_array());

    // The status endpoint now reports completion.
    let app = build_test_app(store);
    let response = get(app, &format!("/api/v1/submissions/{id}")).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["progress"], 100);
    assert!(!json["data"]["evaluated_at"].is_null());
}

// ---------------------------------------------------------------------------
// Health and plumbing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let (store, _) = store_with_problem();
    let app = build_test_app(store);

    let response = get(app, "/health").await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (store, _) = store_with_problem();
    let app = build_test_app(store);

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let (store, _) = store_with_problem();
    let app = build_test_app(store);

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );
}
