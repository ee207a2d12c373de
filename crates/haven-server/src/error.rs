//! HTTP 错误映射
//!
//! 核心 crate 返回类型化错误，这里统一映射为稳定的状态码与错误码。
//! 详细信息只写入日志，不返回给客户端。

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use haven_mood::MoodError;
use haven_session::StorageError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// 应用错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {reason}")]
    Validation {
        field: Option<String>,
        reason: String,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("upstream timed out after {0}s")]
    UpstreamTimeout(u64),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("missing or blank user identity")]
    Unauthorized,
}

impl AppError {
    /// 创建字段校验错误
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            reason: reason.into(),
        }
    }

    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
        }
    }

    /// HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// 返回给客户端的安全消息
    fn public_message(&self) -> String {
        match self {
            AppError::Validation { reason, .. } => reason.clone(),
            AppError::Conflict(_) => "Mood already recorded for today".to_string(),
            AppError::NotFound(_) => "Mood entry not found".to_string(),
            AppError::Upstream(_) => "The assistant is unavailable right now".to_string(),
            AppError::UpstreamTimeout(_) => "The assistant took too long to respond".to_string(),
            AppError::Persistence(_) => "Internal storage error".to_string(),
            AppError::Unauthorized => "Authentication required".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(_) | AppError::UpstreamTimeout(_) | AppError::Persistence(_) => {
                tracing::error!(code = self.code(), "{}", self);
            }
            _ => {
                tracing::warn!(code = self.code(), "{}", self);
            }
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code().to_string(),
            field,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<MoodError> for AppError {
    fn from(e: MoodError) -> Self {
        match e {
            MoodError::Validation { field, reason } => AppError::Validation {
                reason: format!("{} {}", field, reason),
                field: Some(field),
            },
            MoodError::Conflict { .. } => AppError::Conflict(e.to_string()),
            MoodError::NotFound { .. } => AppError::NotFound(e.to_string()),
            MoodError::Io(_) | MoodError::Serde(_) => AppError::Persistence(e.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidInput { message } => AppError::validation("message", message),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let reason = rejection.body_text();
        let field = match rejection {
            JsonRejection::JsonDataError(_) => rejected_field(&reason),
            _ => None,
        };
        AppError::Validation { field, reason }
    }
}

static MISSING_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"missing field `([^`]+)`").expect("missing field pattern is valid"));

static FIELD_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"target type: ([A-Za-z_][A-Za-z0-9_]*)[^:\s]*: ")
        .expect("field path pattern is valid")
});

/// 从反序列化错误文本中取出出错的顶层字段名
fn rejected_field(text: &str) -> Option<String> {
    MISSING_FIELD_RE
        .captures(text)
        .or_else(|| FIELD_PATH_RE.captures(text))
        .map(|cap| cap[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_status_and_code_table() {
        let cases = [
            (AppError::validation("rating", "bad"), 400, "VALIDATION_ERROR"),
            (AppError::Conflict("x".into()), 409, "CONFLICT"),
            (AppError::NotFound("x".into()), 404, "NOT_FOUND"),
            (AppError::Upstream("x".into()), 502, "UPSTREAM_ERROR"),
            (AppError::UpstreamTimeout(30), 504, "UPSTREAM_TIMEOUT"),
            (AppError::Persistence("x".into()), 500, "PERSISTENCE_ERROR"),
            (AppError::Unauthorized, 401, "UNAUTHORIZED"),
        ];
        for (error, status, code) in cases {
            assert_eq!(error.status().as_u16(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_mood_errors_map_by_kind() {
        let conflict = MoodError::Conflict {
            user: "u1".into(),
            day: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(matches!(AppError::from(conflict), AppError::Conflict(_)));

        let validation = AppError::from(MoodError::validation("rating", "out of range"));
        match validation {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("rating")),
            other => panic!("unexpected {:?}", other),
        }

        let io = MoodError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(matches!(AppError::from(io), AppError::Persistence(_)));
    }

    #[test]
    fn test_persistence_detail_is_hidden() {
        let error = AppError::Persistence("/var/lib/haven/moods/u1.json: permission denied".into());
        assert_eq!(error.public_message(), "Internal storage error");
    }

    #[test]
    fn test_rejected_field_names() {
        let missing = "Failed to deserialize the JSON body into the target type: \
                       missing field `rating` at line 1 column 2";
        assert_eq!(rejected_field(missing).as_deref(), Some("rating"));

        let wrong_type = "Failed to deserialize the JSON body into the target type: \
                          message: invalid type: integer `5`, expected a string at line 1 column 13";
        assert_eq!(rejected_field(wrong_type).as_deref(), Some("message"));

        let root = "Failed to deserialize the JSON body into the target type: \
                    invalid type: sequence, expected struct RatingRequest at line 1 column 0";
        assert_eq!(rejected_field(root), None);
    }
}
