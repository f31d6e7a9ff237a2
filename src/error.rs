//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed input, out-of-range values, category mismatch
/// - **Authentication Errors**: bad credentials, missing or expired tokens
/// - **Resource Errors**: unknown users, reservations or unclaimed slots
/// - **Integrity Errors**: corrupt stored password hashes (fatal)
/// - **Infrastructure Errors**: database and geocoder failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request data is missing, malformed or violates a business rule.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Username has surrounding whitespace or uppercase letters.
    ///
    /// Raised instead of failing the predicate so callers can tell a
    /// normalisation problem apart from an invalid name.
    #[error("{0}")]
    Format(String),

    /// An address or coordinate pair could not be resolved.
    #[error("{0}")]
    Resolution(String),

    /// Session token is missing, unknown or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Password did not match the stored hash.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Staff member lacks the role required by the endpoint.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    NotFound(String),

    /// The requested transition conflicts with the current state.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// A stored password hash is structurally invalid. Never retried.
    #[error("Stored credentials for {username} are corrupt")]
    Integrity { username: String },

    /// The geocoding service could not be reached or answered garbage.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database, integrity and internal failures hide their details from the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::Format(ref msg) => (StatusCode::BAD_REQUEST, "format_error", msg.clone()),
            AppError::Resolution(ref msg) => {
                (StatusCode::BAD_REQUEST, "resolution_error", msg.clone())
            }
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "Geocoding service unavailable".to_string(),
            ),
            AppError::Integrity { .. } | AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_taxonomy() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Format("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                AppError::Integrity {
                    username: "alice".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
