// Persistence behind one async trait, with memory, snapshot-file and
// PostgreSQL backends

pub mod memory;
pub mod postgres;
pub mod snapshot;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::models::artisan::{ArtisanProfile, ArtisanProfilePatch, NewArtisanProfile};
use crate::models::catalog::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};
use crate::models::event::{Event, EventPatch, NewEvent};
use crate::models::forum::{
    ForumPost, ForumPostPatch, ForumReply, ForumReplyPatch, NewForumPost, NewForumReply,
};
use crate::models::user::{NewUser, User, UserPatch};
use crate::models::RecordId;
use crate::utils::config::AppConfig;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("corrupt storage data: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Unavailable(error.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    File,
    Postgres,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::File => "file",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(BackendKind::Memory),
            "file" | "json" => Ok(BackendKind::File),
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            other => Err(other.to_string()),
        }
    }
}

/// Persistence for every marketplace entity.
///
/// `list_*` results are in creation order; a `limit` of `None` returns
/// everything. Lookups return `Ok(None)` for a missing record and reserve
/// `Err` for backend failures. `update_*` merges the patch into the stored
/// record and returns the result, or `None` when the id is unknown.
#[async_trait]
pub trait Storage: Send + Sync {
    fn backend(&self) -> BackendKind;

    async fn health_check(&self) -> StorageResult<()>;

    // Users
    async fn list_users(&self, limit: Option<usize>) -> StorageResult<Vec<User>>;
    async fn get_user(&self, id: RecordId) -> StorageResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;
    async fn update_user(&self, id: RecordId, patch: UserPatch) -> StorageResult<Option<User>>;

    // Artisan profiles
    async fn list_artisan_profiles(&self, limit: Option<usize>) -> StorageResult<Vec<ArtisanProfile>>;
    async fn get_artisan_profile(&self, id: RecordId) -> StorageResult<Option<ArtisanProfile>>;
    async fn get_artisan_profile_by_user(
        &self,
        user_id: RecordId,
    ) -> StorageResult<Option<ArtisanProfile>>;
    /// Fails with `Conflict` when the user already has a profile.
    async fn create_artisan_profile(
        &self,
        profile: NewArtisanProfile,
    ) -> StorageResult<ArtisanProfile>;
    async fn update_artisan_profile(
        &self,
        id: RecordId,
        patch: ArtisanProfilePatch,
    ) -> StorageResult<Option<ArtisanProfile>>;

    // Categories
    async fn list_categories(&self, limit: Option<usize>) -> StorageResult<Vec<Category>>;
    async fn get_category(&self, id: RecordId) -> StorageResult<Option<Category>>;
    async fn create_category(&self, category: NewCategory) -> StorageResult<Category>;
    async fn update_category(
        &self,
        id: RecordId,
        patch: CategoryPatch,
    ) -> StorageResult<Option<Category>>;

    // Products
    async fn list_products(&self, limit: Option<usize>) -> StorageResult<Vec<Product>>;
    async fn get_product(&self, id: RecordId) -> StorageResult<Option<Product>>;
    async fn list_products_by_category(&self, category_id: RecordId) -> StorageResult<Vec<Product>>;
    async fn list_products_by_artisan(&self, artisan_id: RecordId) -> StorageResult<Vec<Product>>;
    async fn create_product(&self, product: NewProduct) -> StorageResult<Product>;
    async fn update_product(&self, id: RecordId, patch: ProductPatch) -> StorageResult<Option<Product>>;

    // Events
    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<Event>>;
    async fn get_event(&self, id: RecordId) -> StorageResult<Option<Event>>;
    async fn create_event(&self, event: NewEvent) -> StorageResult<Event>;
    async fn update_event(&self, id: RecordId, patch: EventPatch) -> StorageResult<Option<Event>>;

    // Forum
    async fn list_forum_posts(&self, limit: Option<usize>) -> StorageResult<Vec<ForumPost>>;
    async fn get_forum_post(&self, id: RecordId) -> StorageResult<Option<ForumPost>>;
    async fn list_forum_posts_by_user(&self, user_id: RecordId) -> StorageResult<Vec<ForumPost>>;
    async fn create_forum_post(&self, post: NewForumPost) -> StorageResult<ForumPost>;
    async fn update_forum_post(
        &self,
        id: RecordId,
        patch: ForumPostPatch,
    ) -> StorageResult<Option<ForumPost>>;

    async fn get_forum_reply(&self, id: RecordId) -> StorageResult<Option<ForumReply>>;
    async fn list_forum_replies(&self, post_id: RecordId) -> StorageResult<Vec<ForumReply>>;
    async fn create_forum_reply(&self, reply: NewForumReply) -> StorageResult<ForumReply>;
    async fn update_forum_reply(
        &self,
        id: RecordId,
        patch: ForumReplyPatch,
    ) -> StorageResult<Option<ForumReply>>;
}

/// Opens the configured backend.
///
/// `STORAGE_BACKEND` wins; otherwise a `DATABASE_URL` selects postgres. Any
/// failure to open the chosen backend falls back to memory.
pub async fn connect(config: &AppConfig) -> Arc<dyn Storage> {
    let kind = config.storage_backend.unwrap_or(if config.database_url.is_some() {
        BackendKind::Postgres
    } else {
        BackendKind::Memory
    });

    let opened: StorageResult<Arc<dyn Storage>> = match kind {
        BackendKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        BackendKind::File => MemoryStorage::open(&config.data_file)
            .await
            .map(|storage| Arc::new(storage) as Arc<dyn Storage>),
        BackendKind::Postgres => match config.database_url.as_deref() {
            Some(url) => PostgresStorage::connect(
                url,
                config.db_max_connections,
                config.db_connect_timeout(),
            )
            .await
            .map(|storage| Arc::new(storage) as Arc<dyn Storage>),
            None => Err(StorageError::Unavailable(
                "DATABASE_URL is not set".to_string(),
            )),
        },
    };

    match opened {
        Ok(storage) => {
            tracing::info!("Using {} storage backend", storage.backend());
            storage
        }
        Err(e) => {
            tracing::warn!(
                "Failed to open {} storage ({}); falling back to in-memory storage",
                kind,
                e
            );
            Arc::new(MemoryStorage::new())
        }
    }
}
