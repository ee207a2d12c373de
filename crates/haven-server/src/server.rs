//! HTTP Server - 提供情绪记录与对话 REST API
//!
//! 所有业务路由同时挂载在根路径与 `/api` 下。

use std::net::SocketAddr;

use axum::{
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat, moods};
use crate::state::AppState;

/// 服务器监听参数
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 是否启用宽松 CORS
    pub cors: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors: true,
        }
    }
}

/// 运行 HTTP 服务器
pub async fn run_server(state: AppState, options: ServerOptions) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", options.host, options.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let app = create_router(state, options.cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Haven server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// 业务路由
fn api_routes() -> Router<AppState> {
    Router::new()
        // 对话
        .route("/chat", post(chat::send_message))
        .route("/chat/history", get(chat::history))
        .route("/chat/clear", post(chat::clear))
        // 情绪
        .route("/moods", post(moods::create).get(moods::list))
        .route("/moods/today", get(moods::today))
        .route("/moods/stats", get(moods::stats))
        .route("/moods/:id", put(moods::update))
}

/// 创建路由
pub fn create_router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        // 健康检查
        .route("/health", get(health_handler))
        .merge(api_routes())
        .nest("/api", api_routes())
        // 中间件
        .layer(TraceLayer::new_for_http());

    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// 健康检查处理器
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
