use std::sync::{Arc, Mutex};

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use haven_core::Turn;
use haven_llm::{ClientConfig, LlmClient, LlmError, OpenAiClient};
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<Value>>>,
    auth: Arc<Mutex<Option<String>>>,
}

/// Start a local chat completions stub and return its base URL
async fn spawn_stub(status: StatusCode, reply: Value, captured: Captured) -> String {
    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        *captured.body.lock().unwrap() = Some(body);
                        *captured.auth.lock().unwrap() = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        (status, Json(reply))
                    }
                },
            ),
        )
        .with_state(captured);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/v1", addr)
}

#[tokio::test]
async fn test_generate_reply_against_stub() {
    let captured = Captured::default();
    let base_url = spawn_stub(
        StatusCode::OK,
        json!({"choices": [{"message": {"role": "assistant", "content": "Hello, friend."}}]}),
        captured.clone(),
    )
    .await;

    let client = OpenAiClient::new(ClientConfig::new(base_url).with_api_key("sk-test")).unwrap();
    let reply = client
        .generate_reply(&[Turn::system("be kind"), Turn::user("hi")])
        .await
        .unwrap();

    assert_eq!(reply, "Hello, friend.");
    assert_eq!(
        captured.auth.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );

    let body = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "hi");
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let base_url = spawn_stub(
        StatusCode::UNAUTHORIZED,
        json!({"error": {"message": "bad key"}}),
        Captured::default(),
    )
    .await;

    let client = OpenAiClient::new(ClientConfig::new(base_url).with_max_retries(0)).unwrap();
    let result = client.generate_reply(&[Turn::user("hi")]).await;

    assert!(matches!(result, Err(LlmError::Auth(_))));
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let base_url = spawn_stub(
        StatusCode::BAD_REQUEST,
        json!({"error": {"message": "context too long"}}),
        Captured::default(),
    )
    .await;

    let client = OpenAiClient::new(ClientConfig::new(base_url).with_max_retries(0)).unwrap();
    let result = client.generate_reply(&[Turn::user("hi")]).await;

    match result {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("context too long"));
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind then release so nothing is listening on the port
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAiClient::new(
        ClientConfig::new(format!("http://{}/v1", addr)).with_max_retries(0),
    )
    .unwrap();
    let result = client.generate_reply(&[Turn::user("hi")]).await;

    assert!(matches!(result, Err(LlmError::Network(_))));
}
