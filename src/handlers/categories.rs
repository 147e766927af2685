use axum::extract::State;

use crate::middleware::auth::AuthUser;
use crate::models::catalog::{Category, NewCategory};
use crate::models::errors::AppError;
use crate::models::response::{created, list, ok, ApiResult, CreatedResult, ListParams};
use crate::models::validation::{ApiPath, ApiQuery, ValidatedJson};
use crate::models::RecordId;
use crate::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Vec<Category>> {
    list(state.storage.list_categories(params.limit()?).await?)
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<Category> {
    let id = RecordId::parse(&raw_id, "category")?;
    let category = state
        .storage
        .get_category(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    ok(category)
}

pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<NewCategory>,
) -> CreatedResult<Category> {
    let category = state.storage.create_category(request).await?;
    tracing::info!(category_id = %category.id, user_id = %user.id, "Created category");
    created(category)
}
