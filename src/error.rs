use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::utils::error_codes;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("too many requests")]
    RateLimitExceeded,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, error) = match &self {
            AppError::Validation(msg) => (error_codes::VALIDATION_ERROR, msg.clone()),
            AppError::RateLimitExceeded => (
                error_codes::RATE_LIMIT,
                "Too many requests, please try again later".to_string(),
            ),
            AppError::Storage(err) => {
                // 存储细节只进日志，不返回给客户端
                tracing::error!(error = %err, "Storage operation failed");
                (error_codes::INTERNAL_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(ErrorResponse { code, error })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
