mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{ADMIN, CHANNEL, GROUP, Harness};
use http_body_util::BodyExt;
use number_hunt_back::routes;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn caption(user_id: i64, text: &str, message_id: i64) -> Value {
    json!({
        "user_id": user_id,
        "event": {
            "kind": "caption",
            "caption": text,
            "media": {"chat_id": GROUP, "message_id": message_id}
        }
    })
}

async fn initialized_app() -> (Harness, Router) {
    let h = Harness::new().await;
    let app = routes::router(h.state.clone());
    let base = format!("/groups/{GROUP}/init");

    let (status, body) = call(&app, Method::POST, &base, Some(json!({"user_id": ADMIN}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "awaiting_channel");

    let (status, body) = call(&app, Method::PUT, &base, Some(json!({"channel": CHANNEL}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_number"], 0);
    assert_eq!(body["channel_id"], CHANNEL);

    (h, app)
}

#[tokio::test]
async fn healthcheck_reports_degraded_store() {
    let h = Harness::new().await;
    let app = routes::router(h.state.clone());

    let (status, body) = call(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    h.state.clear_store().await;
    let (status, body) = call(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn accepted_submission_returns_proof_link() {
    let (h, app) = initialized_app().await;
    let uri = format!("/groups/{GROUP}/submissions");

    let (status, body) = call(&app, Method::POST, &uri, Some(caption(42, "1! found it", 10))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number"], 1);
    assert_eq!(body["proof_link"], "https://t.me/hunt_channel/1");
    assert_eq!(h.transport.posts()[0].caption, "#1");

    let (status, body) = call(&app, Method::GET, &format!("/groups/{GROUP}/info"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_number"], 1);
    assert_eq!(body["latest_link"], "https://t.me/hunt_channel/1");

    let (status, body) = call(&app, Method::GET, &format!("/groups/{GROUP}/history"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"number": 1, "link": "https://t.me/hunt_channel/1"}])
    );

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/groups/{GROUP}/users/42/submissions"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_id": 42, "numbers": [1]}));
}

#[tokio::test]
async fn rejections_carry_codes_and_details() {
    let (_h, app) = initialized_app().await;
    let uri = format!("/groups/{GROUP}/submissions");

    let (status, body) = call(&app, Method::POST, &uri, Some(caption(42, "3!", 1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "wrong_number");
    assert_eq!(body["expected"], 1);
    assert_eq!(body["got"], 3);

    let (status, body) = call(&app, Method::POST, &uri, Some(caption(42, "-3!", 5))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "wrong_number");
    assert_eq!(body["expected"], 1);
    assert_eq!(body["got"], -3);

    let (status, body) = call(&app, Method::POST, &uri, Some(caption(42, "no number", 2))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_format");

    call(&app, Method::POST, &uri, Some(caption(42, "1!", 3))).await;
    let (status, body) = call(&app, Method::POST, &uri, Some(caption(42, "1!", 4))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_submitted");
    assert_eq!(body["existing_link"], "https://t.me/hunt_channel/1");
}

#[tokio::test]
async fn command_replies_are_accepted() {
    let (_h, app) = initialized_app().await;
    let request = json!({
        "user_id": 7,
        "event": {
            "kind": "command",
            "text": "/found@hunt_bot 1",
            "reply_to": {"chat_id": GROUP, "message_id": 5}
        }
    });

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/groups/{GROUP}/submissions"),
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number"], 1);
}

#[tokio::test]
async fn invalid_bodies_are_refused() {
    let (_h, app) = initialized_app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/groups/{GROUP}/submissions"),
        Some(caption(0, "1!", 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_failed");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/groups/{GROUP}/reset"),
        Some(json!({"user_id": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_failed");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/groups/{GROUP}/reset"),
        Some(json!({"user": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn malformed_channel_closes_setup() {
    let h = Harness::new().await;
    let app = routes::router(h.state.clone());
    let uri = format!("/groups/{GROUP}/init");

    call(&app, Method::POST, &uri, Some(json!({"user_id": ADMIN}))).await;
    let (status, body) = call(&app, Method::PUT, &uri, Some(json!({"channel": "@"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_channel");
    assert!(h.state.pending_inits().is_empty());

    let (_, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn reset_is_reserved_to_admins() {
    let (h, app) = initialized_app().await;
    let uri = format!("/groups/{GROUP}/reset");

    let (status, body) = call(&app, Method::POST, &uri, Some(json!({"user_id": 42}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "permission_denied");

    let (status, _) = call(&app, Method::POST, &uri, Some(json!({"user_id": ADMIN}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.memory.is_empty());

    let (status, body) = call(&app, Method::GET, &format!("/groups/{GROUP}/stats"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "not_initialized");
}

#[tokio::test]
async fn cancel_reports_whether_setup_was_pending() {
    let h = Harness::new().await;
    let app = routes::router(h.state.clone());
    let uri = format!("/groups/{GROUP}/init");

    let (_, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(body["cancelled"], false);

    call(&app, Method::POST, &uri, Some(json!({"user_id": ADMIN}))).await;
    let (status, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);

    let (status, body) = call(&app, Method::PUT, &uri, Some(json!({"channel": CHANNEL}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "init_not_started");
}

#[tokio::test]
async fn stats_rank_members() {
    let (h, app) = initialized_app().await;
    h.transport.set_username(7, "ana");
    let uri = format!("/groups/{GROUP}/submissions");
    call(&app, Method::POST, &uri, Some(caption(42, "1!", 1))).await;
    call(&app, Method::POST, &uri, Some(caption(7, "2!", 2))).await;
    call(&app, Method::POST, &uri, Some(caption(7, "3!", 3))).await;

    let (status, body) = call(&app, Method::GET, &format!("/groups/{GROUP}/stats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["user_id"], 7);
    assert_eq!(body[0]["username"], "ana");
    assert_eq!(body[0]["count"], 2);
    assert_eq!(body[0]["latest_number"], 3);
    assert_eq!(body[1]["username"], "User 42");
}
