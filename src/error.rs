// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every error renders as `{ "error": string, "errors"?: { field: [messages] } }`.
//! Server-side failures are logged with full detail and surfaced to the
//! caller only as a generic message.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Message returned for any failure whose detail must stay server-side.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(BTreeMap<String, Vec<String>>),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Not authorized")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: &'static str,
        reset_at: DateTime<Utc>,
    },

    #[error("Extraction service error: {0}")]
    Extraction(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_at: Option<String>,
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthenticated | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Extraction(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut retry_after = None;

        let body = match self {
            AppError::Validation(fields) => ErrorResponse {
                error: "Validation failed".to_string(),
                errors: Some(fields),
                reset_at: None,
            },
            AppError::NotFound(what) => ErrorResponse {
                error: format!("{} not found", what),
                errors: None,
                reset_at: None,
            },
            AppError::Conflict(msg) => ErrorResponse {
                error: msg,
                errors: None,
                reset_at: None,
            },
            AppError::RateLimited { message, reset_at } => {
                let secs = (reset_at - Utc::now()).num_seconds().max(1);
                retry_after = Some(secs);
                ErrorResponse {
                    error: message.to_string(),
                    errors: None,
                    reset_at: Some(crate::time_utils::format_utc_rfc3339(reset_at)),
                }
            }
            AppError::Extraction(msg) => {
                tracing::error!(error = %msg, "Extraction service error");
                ErrorResponse {
                    error: "Failed to analyze transcript. Please try again.".to_string(),
                    errors: None,
                    reset_at: None,
                }
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                generic()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                generic()
            }
            other => ErrorResponse {
                error: other.to_string(),
                errors: None,
                reset_at: None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

fn generic() -> ErrorResponse {
    ErrorResponse {
        error: GENERIC_ERROR_MESSAGE.to_string(),
        errors: None,
        reset_at: None,
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
