use axum::extract::State;

use crate::middleware::auth::AuthUser;
use crate::models::errors::AppError;
use crate::models::event::{Event, EventPatch, EventPatchRequest, EventRequest, NewEvent};
use crate::models::response::{created, list, ok, ApiResult, CreatedResult, ListParams};
use crate::models::validation::{ApiPath, ApiQuery, ValidatedJson};
use crate::models::RecordId;
use crate::AppState;

pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Vec<Event>> {
    list(state.storage.list_events(params.limit()?).await?)
}

pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<Event> {
    let id = RecordId::parse(&raw_id, "event")?;
    let event = state
        .storage
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;
    ok(event)
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<EventRequest>,
) -> CreatedResult<Event> {
    let event = state
        .storage
        .create_event(NewEvent::from_request(request, user.id)?)
        .await?;
    tracing::info!(event_id = %event.id, user_id = %user.id, "Created event");
    created(event)
}

/// Partial update. When the creator is on record only they may edit.
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(raw_id): ApiPath<String>,
    ValidatedJson(request): ValidatedJson<EventPatchRequest>,
) -> ApiResult<Event> {
    let id = RecordId::parse(&raw_id, "event")?;
    let event = state
        .storage
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;

    if event.created_by.is_some_and(|creator| creator != user.id) {
        return Err(AppError::forbidden("You can only update events you created"));
    }

    let patch = EventPatch::from(request);
    patch.check_against(&event)?;

    let updated = state
        .storage
        .update_event(id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;
    ok(updated)
}
