/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / problem+json body)
 * - RepoError / validation error / auth error を統一的に変換
 * - 5xx の詳細 (stack trace, upstream payload) はクライアントに返さない
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;

/// Minimal problem description returned for every error response.
#[derive(Debug, Serialize)]
pub struct Problem {
    pub title: &'static str,
    pub status: u16,
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("internal server error")]
    Internal,
    #[error("request deadline exceeded")]
    Timeout,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (title, detail) = match self {
            AppError::BadRequest(message) => ("Bad Request", message),
            AppError::Unauthorized(detail) => ("Unauthorized", detail.to_string()),
            // Never echo which roles the caller does or does not hold.
            AppError::Forbidden => ("Forbidden", "insufficient role".to_string()),
            AppError::NotFound { resource } => ("Not Found", format!("{resource} not found")),
            AppError::Conflict(detail) => ("Conflict", detail.to_string()),
            AppError::Internal => ("Internal Server Error", "internal server error".to_string()),
            AppError::Timeout => ("Gateway Timeout", "request deadline exceeded".to_string()),
        };

        let body = Problem {
            title,
            status: status.as_u16(),
            detail,
        };

        let mut res = (status, Json(body)).into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::Conflict("resource already exists"),
            RepoError::Db(err) => {
                tracing::error!(error = ?err, "database operation failed");
                AppError::Internal
            }
        }
    }
}
