use axum::extract::State;
use std::collections::HashMap;

use crate::middleware::auth::AuthUser;
use crate::models::artisan::{
    ArtisanListing, ArtisanProfile, ArtisanProfileRequest, NewArtisanProfile,
};
use crate::models::errors::AppError;
use crate::models::response::{created, list, ok, ApiResult, CreatedResult, ListParams};
use crate::models::user::{PublicUser, UserPatch};
use crate::models::validation::{ApiPath, ApiQuery, ValidatedJson};
use crate::models::RecordId;
use crate::AppState;

/// Users flagged as artisans, each with their profile when one exists.
pub async fn list_artisans(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Vec<ArtisanListing>> {
    let limit = params.limit()?;
    let mut profiles: HashMap<RecordId, ArtisanProfile> = state
        .storage
        .list_artisan_profiles(None)
        .await?
        .into_iter()
        .map(|profile| (profile.user_id, profile))
        .collect();

    let artisans: Vec<ArtisanListing> = state
        .storage
        .list_users(None)
        .await?
        .into_iter()
        .filter(|user| user.is_artisan)
        .take(limit.unwrap_or(usize::MAX))
        .map(|user| ArtisanListing {
            profile: profiles.remove(&user.id),
            user: PublicUser::from(user),
        })
        .collect();

    list(artisans)
}

pub async fn get_artisan(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<ArtisanListing> {
    let id = RecordId::parse(&raw_id, "artisan")?;
    let user = state
        .storage
        .get_user(id)
        .await?
        .filter(|user| user.is_artisan)
        .ok_or_else(|| AppError::not_found("Artisan"))?;
    let profile = state.storage.get_artisan_profile_by_user(user.id).await?;

    ok(ArtisanListing {
        user: PublicUser::from(user),
        profile,
    })
}

/// Creates the caller's artisan profile and flags the account as an artisan.
///
/// The flag is written first, so a failed profile insert can simply be
/// retried. A profile already stored for a non-artisan account is returned
/// after the flag is set rather than rejected.
pub async fn create_artisan_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<ArtisanProfileRequest>,
) -> CreatedResult<ArtisanProfile> {
    let existing = state.storage.get_artisan_profile_by_user(user.id).await?;
    if existing.is_some() && user.is_artisan {
        return Err(AppError::conflict("Artisan profile already exists"));
    }

    if !user.is_artisan {
        mark_as_artisan(&state, user.id).await?;
    }

    let profile = match existing {
        Some(profile) => {
            tracing::warn!(user_id = %user.id, "Restored artisan flag for existing profile");
            profile
        }
        None => {
            state
                .storage
                .create_artisan_profile(NewArtisanProfile::for_user(user.id, request))
                .await?
        }
    };

    tracing::info!(user_id = %user.id, profile_id = %profile.id, "Created artisan profile");
    created(profile)
}

async fn mark_as_artisan(state: &AppState, user_id: RecordId) -> Result<(), AppError> {
    state
        .storage
        .update_user(
            user_id,
            UserPatch {
                is_artisan: Some(true),
                ..UserPatch::default()
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(())
}
