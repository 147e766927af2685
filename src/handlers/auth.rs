use axum::extract::State;
use serde::Serialize;

use crate::middleware::auth::{AuthUser, MaybeUser};
use crate::models::errors::AppError;
use crate::models::response::{created, ok, ApiResult, CreatedResult};
use crate::models::user::{AuthPayload, LoginRequest, NewUser, PublicUser, RegisterRequest};
use crate::models::validation::ValidatedJson;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LogoutMessage {
    pub message: &'static str,
}

/// Creates an account and signs the caller in.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> CreatedResult<AuthPayload> {
    if state.storage.get_user_by_username(&request.username).await?.is_some() {
        return Err(AppError::conflict("Username already taken"));
    }
    if state.storage.get_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::conflict("Email already registered"));
    }

    let password_hash = state.passwords.hash_password(request.password.clone()).await?;
    let user = state
        .storage
        .create_user(NewUser::from_registration(request, password_hash))
        .await?;
    let token = state.tokens.issue_token(&user)?;

    tracing::info!(user_id = %user.id, username = %user.username, "Registered new user");
    created(AuthPayload {
        user: PublicUser::from(user),
        token,
    })
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let invalid = || AppError::unauthenticated("Invalid username or password");

    let Some(user) = state.storage.get_user_by_username(&request.username).await? else {
        tracing::info!(username = %request.username, "Login failed: unknown username");
        return Err(invalid());
    };

    if !state
        .passwords
        .verify_password(request.password, user.password.clone())
        .await
    {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    let token = state.tokens.issue_token(&user)?;
    tracing::debug!(user_id = %user.id, "User logged in");
    ok(AuthPayload {
        user: PublicUser::from(user),
        token,
    })
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(MaybeUser(user): MaybeUser) -> ApiResult<LogoutMessage> {
    if let Some(user) = user {
        tracing::debug!(user_id = %user.id, "User logged out");
    }
    ok(LogoutMessage {
        message: "Logged out successfully",
    })
}

pub async fn current_user(AuthUser(user): AuthUser) -> ApiResult<PublicUser> {
    ok(PublicUser::from(user))
}
