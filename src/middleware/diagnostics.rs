use axum::{
    body::Body,
    extract::Request,
    http::{
        header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use std::any::Any;

use crate::models::errors::{AppError, ErrorDiagnostics, ErrorEnvelope};

/// Development only: copies the internal failure detail of a 5xx into
/// `error.details`.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(ErrorDiagnostics(detail)) = response.extensions().get::<ErrorDiagnostics>().cloned()
    else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Could not buffer error body for diagnostics: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let Ok(mut envelope) = serde_json::from_slice::<ErrorEnvelope>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    envelope.error.details = Some(serde_json::Value::String(detail));

    match serde_json::to_vec(&envelope) {
        Ok(body) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(body))
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Replaces the router's bare 405 with the error envelope, keeping `Allow`.
pub async fn method_not_allowed(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(CONTENT_TYPE)
    {
        return response;
    }

    let allow = response.headers().get(ALLOW).cloned();
    let mut enveloped = AppError::method_not_allowed(method.as_str()).into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(ALLOW, allow);
    }
    enveloped
}

/// Turns a handler panic into the 500 envelope.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::internal_error(format!("Handler panicked: {}", detail)).into_response()
}

/// Maps middleware errors (the request deadline, mostly) onto the envelope.
pub fn middleware_error(error: BoxError, timeout_seconds: u64) -> AppError {
    if error.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request exceeded {}s deadline", timeout_seconds);
        AppError::timeout(timeout_seconds)
    } else {
        AppError::internal_error(format!("Unhandled middleware error: {}", error))
    }
}
