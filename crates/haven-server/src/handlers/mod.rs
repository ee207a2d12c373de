pub mod chat;
pub mod moods;

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON 请求体提取器，解析失败映射为校验错误
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
