use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use parley_api::dispatcher::Dispatcher;
use parley_api::{AppStateInner, router};
use parley_db::Database;
use parley_messaging::{Messaging, SystemClock};
use parley_types::api::Claims;
use parley_types::models::{PublicProfile, UserId};

const SECRET: &str = "test-secret";

fn app_with(users: &[(i64, &str)], dispatcher: Dispatcher) -> Router {
    let db = Arc::new(Database::open_in_memory().unwrap());
    for &(id, handle) in users {
        db.create_user(&PublicProfile {
            id: UserId(id),
            first_name: handle.into(),
            last_name: "Example".into(),
            handle: handle.into(),
            avatar_url: None,
        })
        .unwrap();
    }

    let messaging = Messaging::from_database(db, Arc::new(SystemClock), Arc::new(dispatcher));
    router(Arc::new(AppStateInner {
        messaging,
        jwt_secret: SECRET.into(),
    }))
}

fn app() -> Router {
    app_with(
        &[(7, "seven"), (42, "answer"), (99, "outsider")],
        Dispatcher::new(),
    )
}

fn expiry() -> usize {
    (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize
}

fn token(user: i64) -> String {
    let claims = Claims::new(UserId(user), expiry());
    let key = EncodingKey::from_secret(SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

async fn call(
    app: &Router,
    user: i64,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post(app: &Router, user: i64, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, user, "POST", uri, Some(body)).await
}

async fn get(app: &Router, user: i64, uri: &str) -> (StatusCode, Value) {
    call(app, user, "GET", uri, None).await
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = app()
        .oneshot(Request::builder().uri("/conversations").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_with_wrong_secret_is_unauthorized() {
    let claims = Claims::new(UserId(7), expiry());
    let forged = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other")).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/conversations")
                .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_numeric_subject_is_unauthorized() {
    let claims = Claims {
        sub: "admin".into(),
        exp: expiry(),
    };
    let key = EncodingKey::from_secret(SECRET.as_bytes());
    let token = encode(&Header::default(), &claims, &key).unwrap();
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/conversations")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_conversation_flow() {
    let app = app();

    let (status, conv) = post(&app, 42, "/conversations", json!({"participant_id": 7})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conv["low_user_id"], 7);
    assert_eq!(conv["high_user_id"], 42);
    assert_eq!(conv["low_user"]["handle"], "seven");
    let conv_id = conv["id"].as_i64().unwrap();

    let (status, again) = post(&app, 7, "/conversations", json!({"participant_id": 42})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], conv_id);

    let uri = format!("/conversations/{conv_id}/messages");
    let (status, msg) = post(&app, 7, &uri, json!({"body": " hello "})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(msg["body"], "hello");
    assert_eq!(msg["sender_id"], 7);
    assert_eq!(msg["is_read"], false);
    let msg_id = msg["id"].as_i64().unwrap();

    let (status, page) = get(&app, 42, &format!("{uri}?page=1&page_size=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["messages"][0]["body"], "hello");
    assert_eq!(page["messages"][0]["sender"]["handle"], "seven");
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["pagination"]["has_next"], false);

    let (_, unread) = get(&app, 42, &format!("/messages/unread?conversation_id={conv_id}")).await;
    assert_eq!(unread["count"], 1);

    let (status, marked) = post(&app, 42, "/messages/read", json!({"message_ids": msg_id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["updated"], 1);

    let (_, unread) = get(&app, 42, "/messages/unread").await;
    assert_eq!(unread["count"], 0);

    let (status, list) = get(&app, 7, "/conversations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["conversation_id"], conv_id);
    assert_eq!(list[0]["other_participant"]["handle"], "answer");
}

#[tokio::test]
async fn errors_map_to_distinct_codes() {
    let app = app();

    let (status, err) = post(&app, 7, "/conversations", json!({"participant_id": 7})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_pair");

    let (status, err) = post(&app, 7, "/conversations", json!({"participant_id": 1000})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "unknown_participant");

    let (_, conv) = post(&app, 7, "/conversations", json!({"participant_id": 42})).await;
    let uri = format!("/conversations/{}/messages", conv["id"]);

    let (status, err) = get(&app, 99, &uri).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"], "forbidden");

    let (status, err) = post(&app, 99, &uri, json!({"body": "let me in"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"], "not_a_participant");

    let (status, err) = post(&app, 7, &uri, json!({"body": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_body");

    let (status, err) = post(&app, 7, &uri, json!({"body": "\0hello"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "invalid_body");

    let (status, err) = get(&app, 7, "/conversations/123456/messages").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "conversation_not_found");
}

#[tokio::test]
async fn sends_reach_live_subscribers() {
    let dispatcher = Dispatcher::new();
    let mut live = dispatcher.subscribe();
    let app = app_with(&[(1, "h1"), (2, "h2")], dispatcher);

    let (_, conv) = post(&app, 1, "/conversations", json!({"participant_id": 2})).await;
    let uri = format!("/conversations/{}/messages", conv["id"]);
    post(&app, 2, &uri, json!({"body": "live"})).await;

    let created = live.recv().await.unwrap();
    assert!(created.is_for(UserId(1)));
    let sent = live.recv().await.unwrap();
    let payload = serde_json::to_value(&sent.event).unwrap();
    assert_eq!(payload["type"], "MessageCreate");
    assert_eq!(payload["data"]["message"]["body"], "live");
}
