use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;
use super::user::PublicUser;
use super::validation::{Validate, Validator};
use super::{merge, merge_optional, Patch, Record, RecordId};

/// Seller details attached one-to-one to a [`super::user::User`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanProfile {
    pub id: RecordId,
    pub user_id: RecordId,
    pub craft: Option<String>,
    pub experience: Option<String>,
    pub story: Option<String>,
    pub verified: bool,
    pub social_media: Option<String>,
    pub skills: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for ArtisanProfile {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// Body of `POST /api/artisans`. The owner is always the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanProfileRequest {
    pub craft: Option<String>,
    pub experience: Option<String>,
    pub story: Option<String>,
    pub social_media: Option<String>,
    pub skills: Option<String>,
}

impl Validate for ArtisanProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.optional_length("craft", self.craft.as_deref(), 2, Some(100));
        v.finish("Invalid artisan data")
    }
}

#[derive(Debug, Clone)]
pub struct NewArtisanProfile {
    pub user_id: RecordId,
    pub craft: Option<String>,
    pub experience: Option<String>,
    pub story: Option<String>,
    pub social_media: Option<String>,
    pub skills: Option<String>,
}

impl NewArtisanProfile {
    pub fn for_user(user_id: RecordId, request: ArtisanProfileRequest) -> Self {
        Self {
            user_id,
            craft: request.craft,
            experience: request.experience,
            story: request.story,
            social_media: request.social_media,
            skills: request.skills,
        }
    }

    /// New profiles start unverified.
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> ArtisanProfile {
        ArtisanProfile {
            id,
            user_id: self.user_id,
            craft: self.craft,
            experience: self.experience,
            story: self.story,
            verified: false,
            social_media: self.social_media,
            skills: self.skills,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtisanProfilePatch {
    pub craft: Option<String>,
    pub experience: Option<String>,
    pub story: Option<String>,
    pub verified: Option<bool>,
    pub social_media: Option<String>,
    pub skills: Option<String>,
}

impl Patch<ArtisanProfile> for ArtisanProfilePatch {
    fn apply_to(self, profile: &mut ArtisanProfile) {
        merge_optional(&mut profile.craft, self.craft);
        merge_optional(&mut profile.experience, self.experience);
        merge_optional(&mut profile.story, self.story);
        merge(&mut profile.verified, self.verified);
        merge_optional(&mut profile.social_media, self.social_media);
        merge_optional(&mut profile.skills, self.skills);
    }
}

/// An artisan as listed publicly: the user fields plus their profile
#[derive(Debug, Clone, Serialize)]
pub struct ArtisanListing {
    #[serde(flatten)]
    pub user: PublicUser,
    pub profile: Option<ArtisanProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_is_unverified() {
        let profile = NewArtisanProfile::for_user(
            RecordId::new(4),
            ArtisanProfileRequest {
                craft: Some("Pottery".into()),
                experience: Some("12 years".into()),
                story: None,
                social_media: None,
                skills: Some("wheel throwing".into()),
            },
        )
        .into_record(RecordId::new(1), Utc::now());

        assert!(!profile.verified);
        assert_eq!(profile.user_id, RecordId::new(4));
    }

    #[test]
    fn test_craft_length() {
        let request = ArtisanProfileRequest {
            craft: Some("x".into()),
            experience: None,
            story: None,
            social_media: None,
            skills: None,
        };
        assert!(request.validate().is_err());
    }
}
