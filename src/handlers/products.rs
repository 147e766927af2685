use axum::extract::State;

use crate::middleware::auth::ArtisanUser;
use crate::models::catalog::{NewProduct, Product};
use crate::models::errors::AppError;
use crate::models::response::{created, list, ok, ApiResult, CreatedResult, ListParams};
use crate::models::validation::{ApiPath, ApiQuery, FieldError, ValidatedJson};
use crate::models::RecordId;
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Vec<Product>> {
    list(state.storage.list_products(params.limit()?).await?)
}

pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<Product> {
    let id = RecordId::parse(&raw_id, "product")?;
    let product = state
        .storage
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    ok(product)
}

pub async fn list_products_by_category(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<Vec<Product>> {
    let category_id = RecordId::parse(&raw_id, "category")?;
    list(state.storage.list_products_by_category(category_id).await?)
}

pub async fn list_products_by_artisan(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<Vec<Product>> {
    let artisan_id = RecordId::parse(&raw_id, "artisan")?;
    list(state.storage.list_products_by_artisan(artisan_id).await?)
}

/// Artisans list products under their own id only.
pub async fn create_product(
    State(state): State<AppState>,
    ArtisanUser(user): ArtisanUser,
    ValidatedJson(request): ValidatedJson<NewProduct>,
) -> CreatedResult<Product> {
    if request.artisan_id != user.id {
        return Err(AppError::forbidden("You can only create products for yourself"));
    }

    if state.storage.get_category(request.category_id).await?.is_none() {
        return Err(AppError::validation_failed(
            "Invalid product data",
            vec![FieldError::new("categoryId", "Category does not exist")],
        ));
    }

    let product = state.storage.create_product(request).await?;
    tracing::info!(product_id = %product.id, artisan_id = %user.id, "Created product");
    created(product)
}
