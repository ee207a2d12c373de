//! 对话接口

use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use haven_session::MessageRecord;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::handlers::AppJson;
use crate::state::AppState;

/// 发送消息请求
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// 发送消息响应
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// 历史记录条目
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for HistoryItem {
    fn from(record: MessageRecord) -> Self {
        Self {
            content: record.content,
            is_user: record.is_user,
            created_at: record.created_at,
        }
    }
}

/// POST /chat
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.chat.send(user.id(), &req.message).await?;
    Ok(Json(ChatResponse { response }))
}

/// GET /chat/history
pub async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<HistoryItem>>, AppError> {
    let records = state.chat.history(user.id()).await?;
    Ok(Json(records.into_iter().map(HistoryItem::from).collect()))
}

/// POST /chat/clear
pub async fn clear(State(state): State<AppState>, user: CurrentUser) -> Json<serde_json::Value> {
    state.chat.clear(user.id());
    Json(serde_json::json!({ "message": "cleared" }))
}
