//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::frame::FrameError;
use crate::storage::StorageError;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// 数据不足以生成当前视图
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::BadRequest(msg)
            | AppError::Validation(msg)
            | AppError::UnsupportedMediaType(msg)
            | AppError::InsufficientData(msg)
            | AppError::ServiceUnavailable(msg) => msg.clone(),
            AppError::Storage(_) => "Object storage request failed".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = crate::middleware::current_request_id()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
            },
        };

        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        } else {
            tracing::warn!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<FrameError> for AppError {
    fn from(e: FrameError) -> Self {
        AppError::BadRequest(format!("Could not read the CSV: {}", e))
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object '{}'", key)),
            StorageError::InvalidKey(key) => {
                AppError::BadRequest(format!("Invalid object key: {}", key))
            }
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidTable(name) => AppError::BadRequest(format!("Invalid table name: {}", name)),
            DbError::NoSource => AppError::BadRequest(
                "No table given and no database.source_query configured".to_string(),
            ),
            DbError::Query(err) => AppError::Database(err),
            DbError::NoColumns => AppError::BadRequest("The query returned no columns".to_string()),
            DbError::Frame(err) => {
                AppError::BadRequest(format!("Could not load the query result: {}", err))
            }
            DbError::ConnectionFailed(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::not_found("Dataset").code(), 404);
        assert_eq!(AppError::BadRequest("test".to_string()).code(), 400);
        assert_eq!(AppError::Validation("rows".to_string()).code(), 400);
        assert_eq!(AppError::UnsupportedMediaType("x".to_string()).code(), 415);
        assert_eq!(AppError::InsufficientData("x".to_string()).code(), 422);
        assert_eq!(AppError::Storage("x".to_string()).code(), 502);
        assert_eq!(AppError::ServiceUnavailable("x".to_string()).code(), 503);
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        let message = error.user_message();
        assert_eq!(message, "Database error occurred");
        assert!(!message.contains("sqlx"));

        let error = AppError::Storage("403 Forbidden from bucket secret-bucket".to_string());
        assert!(!error.user_message().contains("secret-bucket"));
    }

    #[test]
    fn test_database_frame_errors_do_not_mention_csv() {
        let error = AppError::from(DbError::NoColumns);
        assert_eq!(error.code(), 400);
        assert_eq!(error.user_message(), "The query returned no columns");

        let error = AppError::from(DbError::Frame(FrameError::LengthMismatch {
            name: "type".to_string(),
            expected: 3,
            found: 2,
        }));
        assert!(error.user_message().starts_with("Could not load the query result"));
        assert!(!error.user_message().contains("CSV"));
    }

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let error = AppError::from(StorageError::NotFound("raw/netflix.csv".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.user_message(), "Object 'raw/netflix.csv' not found");
    }
}
