//! Router tests driven through tower's `oneshot`

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use pong_server::app::AppState;
use pong_server::config::Config;
use pong_server::http::build_router;
use pong_server::store::InMemoryMatchStore;

fn router() -> (Router, AppState) {
    let state = AppState::new(Config::default(), Arc::new(InMemoryMatchStore::new()))
        .expect("default config is valid");
    (build_router(state.clone()), state)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (router, _) = router();

    let (status, body) = send(&router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_matches"], 0);
}

#[tokio::test]
async fn remote_match_creation_and_conflicts() {
    let (router, state) = router();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let (status, body) = send(
        &router,
        "POST",
        "/matches/remote",
        Some(json!({ "match_id": 12, "player_a": a, "player_b": b })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["match_id"], 12);
    assert_eq!(state.match_registry.match_of(a), Some(12));

    let (status, _) = send(
        &router,
        "POST",
        "/matches/remote",
        Some(json!({ "match_id": 12, "player_a": Uuid::new_v4(), "player_b": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &router,
        "POST",
        "/matches/remote",
        Some(json!({ "match_id": 13, "player_a": a, "player_b": a })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn local_match_input_and_state() {
    let (router, _) = router();

    let (status, body) = send(
        &router,
        "POST",
        "/matches/local",
        Some(json!({ "player": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let match_id = body["match_id"].as_i64().unwrap();
    assert!(match_id < 0);

    let (status, _) = send(
        &router,
        "POST",
        &format!("/matches/{}/input", match_id),
        Some(json!({ "p1_up": true, "p1_down": false, "p2_up": false, "p2_down": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // remote-shaped payload on a local match
    let (status, _) = send(
        &router,
        "POST",
        &format!("/matches/{}/input", match_id),
        Some(json!({ "sender": Uuid::new_v4(), "up": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, view) = send(&router, "GET", &format!("/matches/{}/state", match_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["match_id"], match_id);
    assert_eq!(view["mode"], "local");
    assert!(view["paddles"]["p1_Y"].is_number());
}

#[tokio::test]
async fn remote_input_over_http_needs_a_participant_sender() {
    let (router, _) = router();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    send(
        &router,
        "POST",
        "/matches/remote",
        Some(json!({ "match_id": 5, "player_a": a, "player_b": b })),
    )
    .await;

    let (status, _) = send(
        &router,
        "POST",
        "/matches/5/input",
        Some(json!({ "sender": b, "up": true, "down": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &router,
        "POST",
        "/matches/5/input",
        Some(json!({ "sender": Uuid::new_v4(), "up": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_match_is_not_found() {
    let (router, _) = router();

    let (status, _) = send(&router, "GET", "/matches/999/state", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        "POST",
        "/matches/999/input",
        Some(json!({ "sender": Uuid::new_v4(), "up": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
