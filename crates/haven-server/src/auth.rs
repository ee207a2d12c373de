//! 请求身份提取
//!
//! 身份认证由上游网关完成，网关在 `x-user-id` 头中写入稳定的用户标识。
//! 头缺失或为空时返回 401。

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// 用户标识请求头
pub const USER_ID_HEADER: &str = "x-user-id";

/// 当前请求的用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser(user.to_string()))
    }
}
