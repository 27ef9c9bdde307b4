use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::screening::domain::Answer;
use crate::workflows::screening::router::{self, screening_router, AnswerRequest};

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn start_route_creates_session_on_first_question() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let router = screening_router(Arc::new(service));

    let response = router
        .oneshot(empty_request("POST", "/api/v1/screenings"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["state"], json!({ "screen": "question", "question": 1 }));
    assert_eq!(payload["progress"]["percent"], 0);
    assert!(payload["question"]["text"]
        .as_str()
        .expect("question text")
        .contains("small sounds"));
}

#[tokio::test]
async fn advance_without_answer_is_conflict() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let service = Arc::new(service);
    let view = service.start().expect("session starts");

    let response = screening_router(service)
        .oneshot(empty_request(
            "POST",
            &format!("/api/v1/screenings/{}/advance", view.session_id),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("question 1"));
}

#[tokio::test]
async fn unknown_answer_token_is_unprocessable() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let service = Arc::new(service);
    let view = service.start().expect("session starts");

    let response = router::answer_handler(
        State(service),
        Path(view.session_id.0.clone()),
        axum::Json(AnswerRequest {
            answer: "neutral".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn answer_route_requires_exact_wire_tokens() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let service = Arc::new(service);
    let view = service.start().expect("session starts");
    let uri = format!("/api/v1/screenings/{}/answer", view.session_id);

    for raw in ["SLIGHTLY AGREE", "slightly_agree", "Slightly-Agree"] {
        let response = screening_router(service.clone())
            .oneshot(json_request("PUT", &uri, json!({ "answer": raw })))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{raw:?}");
    }

    let unchanged = service.view(&view.session_id).expect("session exists");
    assert_eq!(unchanged.selected_answer, None);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let router = screening_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "PUT",
            "/api/v1/screenings/scr-missing/answer",
            json!({ "answer": "slightly-agree" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_before_results_is_conflict() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let service = Arc::new(service);
    let view = service.start().expect("session starts");

    let response = router::report_handler(State(service), Path(view.session_id.0.clone())).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn full_walkthrough_returns_report() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let service = Arc::new(service);
    let router = screening_router(service.clone());
    let view = service.start().expect("session starts");
    let base = format!("/api/v1/screenings/{}", view.session_id);

    for _ in 0..10 {
        let answered = router
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("{base}/answer"),
                json!({ "answer": Answer::DefinitelyDisagree.token() }),
            ))
            .await
            .expect("route executes");
        assert_eq!(answered.status(), StatusCode::OK);

        let advanced = router
            .clone()
            .oneshot(empty_request("POST", &format!("{base}/advance")))
            .await
            .expect("route executes");
        assert_eq!(advanced.status(), StatusCode::OK);
    }

    let response = router
        .clone()
        .oneshot(empty_request("GET", &format!("{base}/report")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["report"]["raw_score"], 6);
    assert_eq!(payload["report"]["band"], "ELEVATED");
    assert_eq!(payload["report"]["model"]["status"], "unavailable");
    assert_eq!(
        payload["feature_vector"],
        json!([0, 1, 1, 1, 1, 1, 0, 0, 1, 0])
    );

    let answered_after = router
        .oneshot(json_request(
            "PUT",
            &format!("{base}/answer"),
            json!({ "answer": "slightly-agree" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(answered_after.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn instrument_route_lists_questions_and_options() {
    let (service, _) = build_service(None, Arc::new(RecordingSink::default()));
    let response = screening_router(Arc::new(service))
        .oneshot(empty_request("GET", "/api/v1/instrument"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["questions"].as_array().map(Vec::len), Some(10));
    assert_eq!(payload["questions"][0]["rule"], "agree_scores");
    assert_eq!(payload["options"][3]["token"], "definitely-disagree");
    assert_eq!(payload["classifier_enabled"], false);
}
