//! Error types for the forecast server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::forecast::ForecastError;

/// Application error codes reported in JSON error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    ModelFitting = 5,
    MalformedInput = 6,
    Timeout = 7,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No rows for the requested equipment; answered with a plain-text 404
    #[error("{0}")]
    NoData(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NoData(msg) => {
                return (StatusCode::NOT_FOUND, msg.clone()).into_response();
            }
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Forecast(ForecastError::InvalidConfig(msg)) => {
                tracing::error!("Forecast configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Forecast(e @ ForecastError::MalformedInput(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::MalformedInput,
                e.to_string(),
            ),
            AppError::Forecast(e) => {
                tracing::warn!("Model fitting failed ({}): {}", e.kind(), e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorCode::ModelFitting,
                    e.to_string(),
                )
            }
            AppError::Timeout(msg) => {
                tracing::warn!("Timeout: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, ErrorCode::Timeout, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
