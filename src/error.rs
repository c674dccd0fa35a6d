//! Unified application error model and mapping helpers.
//! Every handler, the session gate and the login/logout endpoints return `AppError`,
//! which renders as `{"error": "<message>"}` with the mapped HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Malformed body or URI.
    InvalidInput { code: String, message: String },
    /// Missing, expired or invalid session; rejected credentials.
    Unauthenticated { code: String, message: String },
    /// Valid session, wrong role.
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    /// Session store or persistence failure. The message is what the client sees,
    /// so it must never carry the underlying cause.
    Dependency { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::InvalidInput { code, .. }
            | AppError::Unauthenticated { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Dependency { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidInput { message, .. }
            | AppError::Unauthenticated { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Dependency { message, .. } => message.as_str(),
        }
    }

    pub fn invalid_input<S: Into<String>>(code: S, msg: S) -> Self { AppError::InvalidInput { code: code.into(), message: msg.into() } }
    pub fn unauthenticated<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthenticated { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn dependency<S: Into<String>>(code: S, msg: S) -> Self { AppError::Dependency { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidInput { .. } => 400,
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Dependency { .. } => 500,
        }
    }

    /// Replace the client-facing message, keeping kind and code.
    pub fn with_message<S: Into<String>>(self, msg: S) -> Self {
        let message = msg.into();
        match self {
            AppError::InvalidInput { code, .. } => AppError::InvalidInput { code, message },
            AppError::Unauthenticated { code, .. } => AppError::Unauthenticated { code, message },
            AppError::Forbidden { code, .. } => AppError::Forbidden { code, message },
            AppError::NotFound { code, .. } => AppError::NotFound { code, message },
            AppError::Dependency { code, .. } => AppError::Dependency { code, message },
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(_) => AppError::invalid_input("invalid_patient", "Invalid json request"),
            StoreError::NotFound(_) => AppError::not_found("patient_not_found", "Patient not found"),
            StoreError::Unavailable(_) => AppError::dependency("storage_error", "Internal server error"),
        }
    }
}
