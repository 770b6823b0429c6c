// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Category of a business-rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Validation,
    Conflict,
    Expired,
}

/// Business-rule failures raised by the order, attendance and QR services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("Invalid bagel type: {0}")]
    InvalidSelection(String),

    #[error("{0}")]
    WindowClosed(String),

    #[error("You already have an order for this day")]
    DuplicateOrder,

    #[error("Invalid or expired QR code")]
    InvalidCode,

    #[error("QR code has expired")]
    Expired,

    #[error("You have already checked in today")]
    AlreadyCheckedIn,
}

impl RuleViolation {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::InvalidSelection(_) | Self::WindowClosed(_) | Self::InvalidCode => {
                RuleKind::Validation
            }
            Self::DuplicateOrder | Self::AlreadyCheckedIn => RuleKind::Conflict,
            Self::Expired => RuleKind::Expired,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidSelection(_) => "invalid_selection",
            Self::WindowClosed(_) => "window_closed",
            Self::DuplicateOrder => "duplicate_order",
            Self::InvalidCode => "invalid_code",
            Self::Expired => "expired",
            Self::AlreadyCheckedIn => "already_checked_in",
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn admin_required(action: &str) -> Self {
        Self::Forbidden(format!("Admin privileges required to {action}"))
    }

    /// The business rule that was violated, if any.
    pub fn rule(&self) -> Option<&RuleViolation> {
        match self {
            Self::Rule(rule) => Some(rule),
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid or expired token".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Rule(rule) => (StatusCode::BAD_REQUEST, rule.code(), rule.to_string()),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Server error".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            error: error.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rule_violations_are_bad_requests() {
        let (status, body) = body_json(RuleViolation::DuplicateOrder.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "duplicate_order");
        assert_eq!(body["message"], "You already have an order for this day");

        let (status, body) = body_json(RuleViolation::Expired.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "expired");
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak_details() {
        let (status, body) =
            body_json(AppError::Database("connection refused to 10.0.0.3".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error");
        assert!(!body.to_string().contains("10.0.0.3"));

        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("secret detail"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::admin_required("confirm orders")
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("order".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_rule_kinds() {
        assert_eq!(RuleViolation::DuplicateOrder.kind(), RuleKind::Conflict);
        assert_eq!(RuleViolation::AlreadyCheckedIn.kind(), RuleKind::Conflict);
        assert_eq!(RuleViolation::InvalidCode.kind(), RuleKind::Validation);
        assert_eq!(RuleViolation::Expired.kind(), RuleKind::Expired);
        assert_eq!(
            RuleViolation::WindowClosed("closed".to_string()).kind(),
            RuleKind::Validation
        );
    }
}
