use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::validation::FieldError;
use crate::services::credentials::CredentialError;
use crate::services::storage::StorageError;
use crate::services::tokens::TokenError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("Authentication error: {message}")]
    AuthenticationError { message: String },

    #[error("Authorization error: {message}")]
    AuthorizationError { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: String },

    #[error("Conflict: {message}")]
    ConflictError { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimitError { message: String, retry_after: u64 },

    #[error("Request timed out after {timeout_seconds} seconds")]
    TimeoutError { timeout_seconds: u64 },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

/// Failure half of the response envelope: `{ success: false, error: {..} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                message: message.into(),
                details,
            },
        }
    }
}

/// Internal failure detail carried on a 5xx response.
///
/// Never serialized by default; the development-only diagnostics layer copies
/// it into `error.details`.
#[derive(Debug, Clone)]
pub struct ErrorDiagnostics(pub String);

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthenticationError { .. } => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::ConflictError { .. } => StatusCode::CONFLICT,
            AppError::RateLimitError { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::TimeoutError { .. } => StatusCode::REQUEST_TIMEOUT,
            AppError::StorageUnavailable { .. } | AppError::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message a client is allowed to see.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError { message, .. }
            | AppError::AuthenticationError { message }
            | AppError::AuthorizationError { message }
            | AppError::ConflictError { message }
            | AppError::RateLimitError { message, .. } => message.clone(),
            AppError::NotFound { resource } => format!("{} not found", resource),
            AppError::MethodNotAllowed { .. } => "Method not allowed".to_string(),
            AppError::TimeoutError { .. } => "Request timed out".to_string(),
            AppError::StorageUnavailable { .. } => "Storage temporarily unavailable".to_string(),
            AppError::InternalError { .. } => "Internal server error".to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError { details, .. } if !details.is_empty() => {
                serde_json::to_value(details).ok()
            }
            _ => None,
        }
    }

    fn diagnostics(&self) -> Option<String> {
        match self {
            AppError::StorageUnavailable { message } | AppError::InternalError { message } => {
                Some(message.clone())
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorEnvelope::new(self.public_message(), self.details());
        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimitError { retry_after, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        if let Some(detail) = self.diagnostics() {
            response.extensions_mut().insert(ErrorDiagnostics(detail));
        }

        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError {
            message: "Invalid request body".to_string(),
            details: vec![FieldError::new("body", rejection.body_text())],
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError {
            message: "Invalid query parameters".to_string(),
            details: vec![FieldError::new("query", rejection.body_text())],
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError {
            message: "Invalid path parameters".to_string(),
            details: vec![FieldError::new("path", rejection.body_text())],
        }
    }
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Conflict(message) => AppError::ConflictError { message },
            other => AppError::StorageUnavailable {
                message: other.to_string(),
            },
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(error: CredentialError) -> Self {
        AppError::internal_error(format!("Credential error: {}", error))
    }
}

impl From<TokenError> for AppError {
    fn from(error: TokenError) -> Self {
        AppError::internal_error(format!("Token error: {}", error))
    }
}

// Convenience functions for creating specific errors
impl AppError {
    pub fn validation_failed(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        AppError::ValidationError {
            message: message.into(),
            details,
        }
    }

    pub fn invalid_id(resource: &str) -> Self {
        AppError::ValidationError {
            message: format!("Invalid {} ID", resource),
            details: Vec::new(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::AuthenticationError {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::AuthorizationError {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        AppError::MethodNotAllowed {
            method: method.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::ConflictError {
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: u64) -> Self {
        AppError::RateLimitError {
            message: message.into(),
            retry_after,
        }
    }

    pub fn timeout(timeout_seconds: u64) -> Self {
        AppError::TimeoutError { timeout_seconds }
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        AppError::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        AppError::InternalError {
            message: message.into(),
        }
    }
}
