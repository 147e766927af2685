use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;

use crate::models::errors::AppError;
use crate::models::user::User;
use crate::AppState;

/// The caller behind a verified bearer token, freshly loaded from storage.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

/// Soft authentication: attaches an [`Identity`] when the bearer token checks
/// out and otherwise lets the request through anonymous. Never rejects.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        if let Some(user) = resolve_identity(&state, token).await {
            request.extensions_mut().insert(Identity { user });
        }
    }
    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve_identity(state: &AppState, token: &str) -> Option<User> {
    let claims = match state.tokens.verify_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring bearer token: {}", e);
            return None;
        }
    };

    match state.storage.get_user(claims.user_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            tracing::debug!("Bearer token names unknown user {}", claims.user_id);
            None
        }
        Err(e) => {
            tracing::warn!("Could not load user {} for bearer token: {}", claims.user_id, e);
            None
        }
    }
}

/// The caller if authenticated
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<Identity>().map(|identity| identity.user.clone()),
        ))
    }
}

/// Requires an authenticated caller; 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .map(|identity| AuthUser(identity.user.clone()))
            .ok_or_else(|| AppError::unauthenticated("Authentication required"))
    }
}

/// Requires an authenticated artisan; 401 when anonymous, 403 otherwise.
#[derive(Debug, Clone)]
pub struct ArtisanUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ArtisanUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_artisan {
            return Err(AppError::forbidden("Access restricted to artisans only"));
        }
        Ok(ArtisanUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_policy_extractors_without_identity() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();

        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(user.is_none());

        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);

        let err = ArtisanUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
