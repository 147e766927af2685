use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;
use super::validation::{Validate, Validator};
use super::{merge, merge_optional, Patch, Record, RecordId};

/// A stored account. `password` holds the scrypt hash and must never reach a
/// client; responses go through [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_artisan: bool,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub join_date: DateTime<Utc>,
}

impl Record for User {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// Client-facing view of a [`User`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_artisan: bool,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub join_date: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: user.profile_picture.clone(),
            bio: user.bio.clone(),
            is_artisan: user.is_artisan,
            location: user.location.clone(),
            contact_info: user.contact_info.clone(),
            join_date: user.join_date,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser::from(&user)
    }
}

/// Author line shown next to forum posts and replies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: RecordId,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub is_artisan: bool,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: user.profile_picture.clone(),
            is_artisan: user.is_artisan,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_artisan: bool,
    pub location: Option<String>,
    pub bio: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("username", &self.username, 3, Some(50))
            .email("email", &self.email)
            .length("password", &self.password, 6, None)
            .optional_length("firstName", self.first_name.as_deref(), 2, None)
            .optional_length("lastName", self.last_name.as_deref(), 2, None);
        v.finish("Invalid registration data")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("username", &self.username, 3, None)
            .length("password", &self.password, 6, None);
        v.finish("Invalid login data")
    }
}

/// `{ user, token }` returned by register and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub user: PublicUser,
    pub token: String,
}

/// Everything needed to create a user; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_artisan: bool,
    pub location: Option<String>,
    pub bio: Option<String>,
}

impl NewUser {
    pub fn from_registration(request: RegisterRequest, password_hash: String) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            is_artisan: request.is_artisan,
            location: request.location,
            bio: request.bio,
        }
    }

    pub fn into_record(self, id: RecordId, join_date: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            profile_picture: None,
            bio: self.bio,
            is_artisan: self.is_artisan,
            location: self.location,
            contact_info: None,
            join_date,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub is_artisan: Option<bool>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
}

impl Patch<User> for UserPatch {
    fn apply_to(self, user: &mut User) {
        merge(&mut user.email, self.email);
        merge(&mut user.password, self.password);
        merge_optional(&mut user.first_name, self.first_name);
        merge_optional(&mut user.last_name, self.last_name);
        merge_optional(&mut user.profile_picture, self.profile_picture);
        merge_optional(&mut user.bio, self.bio);
        merge(&mut user.is_artisan, self.is_artisan);
        merge_optional(&mut user.location, self.location);
        merge_optional(&mut user.contact_info, self.contact_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        NewUser {
            username: "alice".into(),
            email: "alice@x.com".into(),
            password: "deadbeef.cafe".into(),
            first_name: Some("Alice".into()),
            last_name: None,
            is_artisan: false,
            location: Some("Jaipur".into()),
            bio: None,
        }
        .into_record(RecordId::new(1), Utc::now())
    }

    #[test]
    fn test_public_user_has_no_password() {
        let json = serde_json::to_value(PublicUser::from(sample_user())).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["isArtisan"], false);
        assert!(json.get("joinDate").is_some());
    }

    #[test]
    fn test_register_request_defaults_and_validation() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "secret1"
        }))
        .unwrap();
        assert!(!request.is_artisan);
        assert!(request.validate().is_ok());

        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "al",
            "email": "nope",
            "password": "123",
            "firstName": "A"
        }))
        .unwrap();
        match request.validate().unwrap_err() {
            AppError::ValidationError { details, .. } => assert_eq!(details.len(), 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_patch_merges_only_supplied_fields() {
        let mut user = sample_user();
        UserPatch {
            is_artisan: Some(true),
            bio: Some("Block printer".into()),
            ..UserPatch::default()
        }
        .apply_to(&mut user);

        assert!(user.is_artisan);
        assert_eq!(user.bio.as_deref(), Some("Block printer"));
        assert_eq!(user.first_name.as_deref(), Some("Alice"));
        assert_eq!(user.location.as_deref(), Some("Jaipur"));
    }
}
