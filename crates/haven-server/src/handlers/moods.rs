//! 情绪记录接口

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use haven_mood::{MoodEntry, MoodSummary};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::handlers::AppJson;
use crate::state::AppState;

/// 评分请求
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
}

/// POST /moods
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<RatingRequest>,
) -> Result<(StatusCode, Json<MoodEntry>), AppError> {
    let entry = state.moods.create(user.id(), req.rating).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /moods/:id
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<RatingRequest>,
) -> Result<Json<MoodEntry>, AppError> {
    let entry = state.moods.update(user.id(), &id, req.rating).await?;
    Ok(Json(entry))
}

/// GET /moods
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<MoodEntry>>, AppError> {
    Ok(Json(state.moods.list_recent(user.id()).await?))
}

/// GET /moods/today，没有记录时返回 `null`
pub async fn today(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Option<MoodEntry>>, AppError> {
    Ok(Json(state.moods.today(user.id()).await?))
}

/// GET /moods/stats
pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MoodSummary>, AppError> {
    Ok(Json(state.moods.stats(user.id()).await?))
}
