use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::services::rate_limiter::client_key;
use crate::AppState;

/// Throttles credential endpoints per client address before the body is read.
pub async fn throttle_credentials(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if let Err(rejection) = state.rate_limiter.check(&client_key(addr)).await {
        return rejection.into_response();
    }
    next.run(request).await
}
