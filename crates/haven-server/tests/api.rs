//! HTTP 接口集成测试，直接驱动 Router，不启动监听

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use haven_config::{Config, StorageType};
use haven_core::{Clock, SystemClock, Turn};
use haven_llm::{LlmClient, LlmError};
use haven_mood::{InMemoryMoodLedger, MoodService, MoodTemporalPolicy, TimezonePolicy};
use haven_server::{create_router, AppState, ChatService, ChatSettings, USER_ID_HEADER};
use haven_session::{
    ConversationContextStore, HistoryPolicy, InMemoryMessageLedger, InMemorySessionStore,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// 固定回复 "hello"
struct HelloClient;

#[async_trait]
impl LlmClient for HelloClient {
    fn provider_id(&self) -> &str {
        "hello"
    }

    async fn generate_reply(&self, _turns: &[Turn]) -> Result<String, LlmError> {
        Ok("hello".to_string())
    }
}

/// 永远不会及时返回
struct StalledClient;

#[async_trait]
impl LlmClient for StalledClient {
    fn provider_id(&self) -> &str {
        "stalled"
    }

    async fn generate_reply(&self, _turns: &[Turn]) -> Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}

fn memory_config() -> Config {
    let mut config = Config::default();
    config.storage.storage_type = StorageType::Memory;
    config
}

fn app_with(llm: Arc<dyn LlmClient>) -> Router {
    let state = AppState::assemble(
        &memory_config(),
        Arc::new(InMemoryMessageLedger::new()),
        Arc::new(InMemoryMoodLedger::new()),
        llm,
        Arc::new(SystemClock),
    )
    .unwrap();
    create_router(state, false)
}

fn app() -> Router {
    app_with(Arc::new(HelloClient))
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let app = app();
    let (status, body) = send(
        &app,
        request(Method::POST, "/moods", None, Some(json!({"rating": 3}))),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, request(Method::GET, "/chat/history", Some("   "), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_one_mood_per_day() {
    let app = app();

    let (status, first) = send(
        &app,
        request(Method::POST, "/moods", Some("u1"), Some(json!({"rating": 4}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["rating"], 4);
    assert!(first["id"].is_string());

    let (status, body) = send(
        &app,
        request(Method::POST, "/moods", Some("u1"), Some(json!({"rating": 2}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, today) = send(&app, request(Method::GET, "/moods/today", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(today["id"], first["id"]);
    assert_eq!(today["rating"], 4);

    // 其他用户不受影响
    let (status, _) = send(
        &app,
        request(Method::POST, "/moods", Some("u2"), Some(json!({"rating": 1}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_today_without_entry_is_null() {
    let app = app();
    let (status, body) = send(&app, request(Method::GET, "/moods/today", Some("u1"), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_rating_out_of_range_is_rejected() {
    let app = app();

    for rating in [0, 6, -1] {
        let (status, body) = send(
            &app,
            request(Method::POST, "/moods", Some("u1"), Some(json!({"rating": rating}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field"], "rating");
    }

    let (_, today) = send(&app, request(Method::GET, "/moods/today", Some("u1"), None)).await;
    assert!(today.is_null());
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = app();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/moods")
        .header(USER_ID_HEADER, "u1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        request(Method::POST, "/moods", Some("u1"), Some(json!({"rating": "five"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "rating");

    let (status, body) = send(&app, request(Method::POST, "/moods", Some("u1"), Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "rating");

    let (status, body) = send(
        &app,
        request(Method::POST, "/chat", Some("u1"), Some(json!({"text": "hi"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "message");
}

#[tokio::test]
async fn test_update_rating() {
    let app = app();

    let (_, created) = send(
        &app,
        request(Method::POST, "/moods", Some("u1"), Some(json!({"rating": 2}))),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            &format!("/moods/{}", id),
            Some("u1"),
            Some(json!({"rating": 5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["rating"], 5);

    // 不能修改他人的记录
    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            &format!("/moods/{}", id),
            Some("u2"),
            Some(json!({"rating": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            "/moods/does-not-exist",
            Some("u1"),
            Some(json!({"rating": 3})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, today) = send(&app, request(Method::GET, "/moods/today", Some("u1"), None)).await;
    assert_eq!(today["rating"], 5);
}

#[tokio::test]
async fn test_list_and_stats() {
    let app = app();

    let (status, stats) = send(&app, request(Method::GET, "/moods/stats", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 0);
    assert_eq!(stats["average"], 0.0);

    send(
        &app,
        request(Method::POST, "/moods", Some("u1"), Some(json!({"rating": 3}))),
    )
    .await;

    let (status, list) = send(&app, request(Method::GET, "/moods", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, stats) = send(&app, request(Method::GET, "/moods/stats", Some("u1"), None)).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["average"], 3.0);
    assert_eq!(stats["distribution"]["3"], 1);

    let (_, other) = send(&app, request(Method::GET, "/moods", Some("u2"), None)).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_exchange_and_history() {
    let app = app();

    let (status, body) = send(
        &app,
        request(Method::POST, "/chat", Some("u1"), Some(json!({"message": "hi"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "hello");

    let (status, history) = send(&app, request(Method::GET, "/chat/history", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    let items = history.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "hi");
    assert_eq!(items[0]["isUser"], true);
    assert_eq!(items[1]["content"], "hello");
    assert_eq!(items[1]["isUser"], false);
    assert!(items[0]["createdAt"].is_string());

    let (_, other) = send(&app, request(Method::GET, "/chat/history", Some("u2"), None)).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        request(Method::POST, "/chat", Some("u1"), Some(json!({"message": "   "}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "message");

    let (_, history) = send(&app, request(Method::GET, "/chat/history", Some("u1"), None)).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_keeps_history() {
    let app = app();
    send(
        &app,
        request(Method::POST, "/chat", Some("u1"), Some(json!({"message": "hi"}))),
    )
    .await;

    let (status, body) = send(&app, request(Method::POST, "/chat/clear", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "cleared");

    let (_, history) = send(&app, request(Method::GET, "/chat/history", Some("u1"), None)).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_routes_are_served_under_api_prefix() {
    let app = app();

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/moods", Some("u1"), Some(json!({"rating": 5}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // 同一份状态
    let (_, today) = send(&app, request(Method::GET, "/moods/today", Some("u1"), None)).await;
    assert_eq!(today["rating"], 5);

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/chat", Some("u1"), Some(json!({"message": "hi"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "hello");
}

#[tokio::test]
async fn test_upstream_timeout_keeps_user_message() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let message_ledger = Arc::new(InMemoryMessageLedger::new());
    let mood_ledger = Arc::new(InMemoryMoodLedger::new());

    let context = Arc::new(ConversationContextStore::new(
        HistoryPolicy::Bounded,
        Arc::new(InMemorySessionStore::new()),
        message_ledger.clone(),
        clock.clone(),
    ));
    let settings = ChatSettings {
        llm_timeout: Duration::from_millis(50),
        ..ChatSettings::default()
    };
    let chat = ChatService::new(
        context,
        message_ledger,
        Arc::new(StalledClient),
        clock.clone(),
        settings,
    );
    let moods = MoodService::new(
        mood_ledger.clone(),
        MoodTemporalPolicy::new(mood_ledger, TimezonePolicy::Utc),
        clock,
        30,
    );
    let app = create_router(AppState::new(Arc::new(chat), Arc::new(moods)), false);

    let (status, body) = send(
        &app,
        request(Method::POST, "/chat", Some("u1"), Some(json!({"message": "anyone there?"}))),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "UPSTREAM_TIMEOUT");

    let (_, history) = send(&app, request(Method::GET, "/chat/history", Some("u1"), None)).await;
    let items = history.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["content"], "anyone there?");
    assert_eq!(items[0]["isUser"], true);
}
