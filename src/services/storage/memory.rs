use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

use super::snapshot::SnapshotFile;
use super::{BackendKind, Storage, StorageError, StorageResult};
use crate::models::artisan::{ArtisanProfile, ArtisanProfilePatch, NewArtisanProfile};
use crate::models::catalog::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};
use crate::models::event::{Event, EventPatch, NewEvent};
use crate::models::forum::{
    ForumPost, ForumPostPatch, ForumReply, ForumReplyPatch, NewForumPost, NewForumReply,
};
use crate::models::user::{NewUser, User, UserPatch};
use crate::models::{Patch, Record, RecordId};

/// Rows of one entity kept in id order, plus the next id to hand out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table<T> {
    next_id: i64,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

impl<T: Record> Table<T> {
    pub(crate) fn insert_with(&mut self, build: impl FnOnce(RecordId) -> T) -> T {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        let row = build(id);
        self.rows.push(row.clone());
        row
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.rows.binary_search_by_key(&id, |row| row.id()).ok()
    }

    pub(crate) fn get(&self, id: RecordId) -> Option<T> {
        self.position(id).and_then(|index| self.rows.get(index)).cloned()
    }

    pub(crate) fn any(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.rows.iter().any(predicate)
    }

    pub(crate) fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.iter().find(|row| predicate(row)).cloned()
    }

    pub(crate) fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.iter().filter(|row| predicate(row)).cloned().collect()
    }

    pub(crate) fn list(&self, limit: Option<usize>) -> Vec<T> {
        let take = limit.filter(|&n| n > 0).unwrap_or(usize::MAX);
        self.rows.iter().take(take).cloned().collect()
    }

    pub(crate) fn update<P: Patch<T>>(&mut self, id: RecordId, patch: P) -> Option<T> {
        let index = self.position(id)?;
        let row = self.rows.get_mut(index)?;
        patch.apply_to(row);
        Some(row.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Restores id order and keeps the counter ahead of every stored id.
    fn repair(&mut self) {
        self.rows.sort_by_key(|row| row.id());
        let highest = self.rows.last().map(|row| row.id().get()).unwrap_or(0);
        self.next_id = self.next_id.max(highest + 1);
    }
}

/// The whole data set; also the on-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tables {
    pub(crate) users: Table<User>,
    pub(crate) artisan_profiles: Table<ArtisanProfile>,
    pub(crate) categories: Table<Category>,
    pub(crate) products: Table<Product>,
    pub(crate) events: Table<Event>,
    pub(crate) forum_posts: Table<ForumPost>,
    pub(crate) forum_replies: Table<ForumReply>,
}

impl Tables {
    pub(crate) fn repair(&mut self) {
        self.users.repair();
        self.artisan_profiles.repair();
        self.categories.repair();
        self.products.repair();
        self.events.repair();
        self.forum_posts.repair();
        self.forum_replies.repair();
    }
}

/// In-process storage. With a [`SnapshotFile`] attached every write is
/// persisted before it becomes visible.
pub struct MemoryStorage {
    tables: RwLock<Tables>,
    snapshot: Option<SnapshotFile>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot: None,
        }
    }

    /// Loads `path` (empty when missing) and persists every later write to it.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let snapshot = SnapshotFile::new(path);
        let tables = snapshot.load().await?;
        tracing::info!(
            "Loaded storage snapshot from {} ({} users, {} products)",
            snapshot.path().display(),
            tables.users.len(),
            tables.products.len()
        );

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(snapshot),
        })
    }

    async fn read<R>(&self, op: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.read().await;
        op(&tables)
    }

    async fn write<R: Send>(
        &self,
        op: impl FnOnce(&mut Tables) -> StorageResult<R> + Send,
    ) -> StorageResult<R> {
        let mut tables = self.tables.write().await;
        match &self.snapshot {
            None => op(&mut tables),
            Some(snapshot) => {
                let mut staged = tables.clone();
                let result = op(&mut staged)?;
                snapshot.save(&staged).await?;
                *tables = staged;
                Ok(result)
            }
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend(&self) -> BackendKind {
        if self.snapshot.is_some() {
            BackendKind::File
        } else {
            BackendKind::Memory
        }
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn list_users(&self, limit: Option<usize>) -> StorageResult<Vec<User>> {
        Ok(self.read(|t| t.users.list(limit)).await)
    }

    async fn get_user(&self, id: RecordId) -> StorageResult<Option<User>> {
        Ok(self.read(|t| t.users.get(id)).await)
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        Ok(self.read(|t| t.users.find(|u| u.username == username)).await)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self.read(|t| t.users.find(|u| u.email == email)).await)
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        self.write(move |t| {
            if t.users.any(|u| u.username == user.username) {
                return Err(StorageError::Conflict("Username already taken".to_string()));
            }
            if t.users.any(|u| u.email == user.email) {
                return Err(StorageError::Conflict("Email already registered".to_string()));
            }
            Ok(t.users.insert_with(|id| user.into_record(id, Utc::now())))
        })
        .await
    }

    async fn update_user(&self, id: RecordId, patch: UserPatch) -> StorageResult<Option<User>> {
        self.write(move |t| {
            if let Some(email) = &patch.email {
                if t.users.any(|u| u.id != id && &u.email == email) {
                    return Err(StorageError::Conflict("Email already registered".to_string()));
                }
            }
            Ok(t.users.update(id, patch))
        })
        .await
    }

    async fn list_artisan_profiles(&self, limit: Option<usize>) -> StorageResult<Vec<ArtisanProfile>> {
        Ok(self.read(|t| t.artisan_profiles.list(limit)).await)
    }

    async fn get_artisan_profile(&self, id: RecordId) -> StorageResult<Option<ArtisanProfile>> {
        Ok(self.read(|t| t.artisan_profiles.get(id)).await)
    }

    async fn get_artisan_profile_by_user(
        &self,
        user_id: RecordId,
    ) -> StorageResult<Option<ArtisanProfile>> {
        Ok(self.read(|t| t.artisan_profiles.find(|p| p.user_id == user_id)).await)
    }

    async fn create_artisan_profile(
        &self,
        profile: NewArtisanProfile,
    ) -> StorageResult<ArtisanProfile> {
        self.write(move |t| {
            if t.artisan_profiles.any(|p| p.user_id == profile.user_id) {
                return Err(StorageError::Conflict("Artisan profile already exists".to_string()));
            }
            Ok(t.artisan_profiles.insert_with(|id| profile.into_record(id, Utc::now())))
        })
        .await
    }

    async fn update_artisan_profile(
        &self,
        id: RecordId,
        patch: ArtisanProfilePatch,
    ) -> StorageResult<Option<ArtisanProfile>> {
        self.write(move |t| Ok(t.artisan_profiles.update(id, patch))).await
    }

    async fn list_categories(&self, limit: Option<usize>) -> StorageResult<Vec<Category>> {
        Ok(self.read(|t| t.categories.list(limit)).await)
    }

    async fn get_category(&self, id: RecordId) -> StorageResult<Option<Category>> {
        Ok(self.read(|t| t.categories.get(id)).await)
    }

    async fn create_category(&self, category: NewCategory) -> StorageResult<Category> {
        self.write(move |t| Ok(t.categories.insert_with(|id| category.into_record(id, Utc::now()))))
            .await
    }

    async fn update_category(
        &self,
        id: RecordId,
        patch: CategoryPatch,
    ) -> StorageResult<Option<Category>> {
        self.write(move |t| Ok(t.categories.update(id, patch))).await
    }

    async fn list_products(&self, limit: Option<usize>) -> StorageResult<Vec<Product>> {
        Ok(self.read(|t| t.products.list(limit)).await)
    }

    async fn get_product(&self, id: RecordId) -> StorageResult<Option<Product>> {
        Ok(self.read(|t| t.products.get(id)).await)
    }

    async fn list_products_by_category(&self, category_id: RecordId) -> StorageResult<Vec<Product>> {
        Ok(self
            .read(|t| t.products.filter(|p| p.category_id == Some(category_id)))
            .await)
    }

    async fn list_products_by_artisan(&self, artisan_id: RecordId) -> StorageResult<Vec<Product>> {
        Ok(self.read(|t| t.products.filter(|p| p.artisan_id == artisan_id)).await)
    }

    async fn create_product(&self, product: NewProduct) -> StorageResult<Product> {
        self.write(move |t| Ok(t.products.insert_with(|id| product.into_record(id, Utc::now()))))
            .await
    }

    async fn update_product(&self, id: RecordId, patch: ProductPatch) -> StorageResult<Option<Product>> {
        self.write(move |t| Ok(t.products.update(id, patch))).await
    }

    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<Event>> {
        Ok(self.read(|t| t.events.list(limit)).await)
    }

    async fn get_event(&self, id: RecordId) -> StorageResult<Option<Event>> {
        Ok(self.read(|t| t.events.get(id)).await)
    }

    async fn create_event(&self, event: NewEvent) -> StorageResult<Event> {
        self.write(move |t| Ok(t.events.insert_with(|id| event.into_record(id, Utc::now()))))
            .await
    }

    async fn update_event(&self, id: RecordId, patch: EventPatch) -> StorageResult<Option<Event>> {
        self.write(move |t| Ok(t.events.update(id, patch))).await
    }

    async fn list_forum_posts(&self, limit: Option<usize>) -> StorageResult<Vec<ForumPost>> {
        Ok(self.read(|t| t.forum_posts.list(limit)).await)
    }

    async fn get_forum_post(&self, id: RecordId) -> StorageResult<Option<ForumPost>> {
        Ok(self.read(|t| t.forum_posts.get(id)).await)
    }

    async fn list_forum_posts_by_user(&self, user_id: RecordId) -> StorageResult<Vec<ForumPost>> {
        Ok(self.read(|t| t.forum_posts.filter(|p| p.user_id == user_id)).await)
    }

    async fn create_forum_post(&self, post: NewForumPost) -> StorageResult<ForumPost> {
        self.write(move |t| Ok(t.forum_posts.insert_with(|id| post.into_record(id, Utc::now()))))
            .await
    }

    async fn update_forum_post(
        &self,
        id: RecordId,
        patch: ForumPostPatch,
    ) -> StorageResult<Option<ForumPost>> {
        self.write(move |t| Ok(t.forum_posts.update(id, patch))).await
    }

    async fn get_forum_reply(&self, id: RecordId) -> StorageResult<Option<ForumReply>> {
        Ok(self.read(|t| t.forum_replies.get(id)).await)
    }

    async fn list_forum_replies(&self, post_id: RecordId) -> StorageResult<Vec<ForumReply>> {
        Ok(self.read(|t| t.forum_replies.filter(|r| r.post_id == post_id)).await)
    }

    async fn create_forum_reply(&self, reply: NewForumReply) -> StorageResult<ForumReply> {
        self.write(move |t| Ok(t.forum_replies.insert_with(|id| reply.into_record(id, Utc::now()))))
            .await
    }

    async fn update_forum_reply(
        &self,
        id: RecordId,
        patch: ForumReplyPatch,
    ) -> StorageResult<Option<ForumReply>> {
        self.write(move |t| Ok(t.forum_replies.update(id, patch))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "hash.salt".to_string(),
            first_name: None,
            last_name: None,
            is_artisan: false,
            location: None,
            bio: None,
        }
    }

    fn category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            description: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_get_list_users() {
        let storage = MemoryStorage::new();
        let alice = storage.create_user(new_user("alice")).await.unwrap();
        let bob = storage.create_user(new_user("bob")).await.unwrap();

        assert_eq!(alice.id, RecordId::new(1));
        assert_eq!(bob.id, RecordId::new(2));
        assert_eq!(storage.get_user(alice.id).await.unwrap(), Some(alice.clone()));
        assert_eq!(
            storage.get_user_by_username("bob").await.unwrap().map(|u| u.id),
            Some(bob.id)
        );
        assert_eq!(
            storage.get_user_by_email("alice@example.com").await.unwrap().map(|u| u.id),
            Some(alice.id)
        );
        assert!(storage.get_user(RecordId::new(99)).await.unwrap().is_none());

        let users = storage.list_users(None).await.unwrap();
        assert_eq!(users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(), ["alice", "bob"]);
        assert_eq!(storage.list_users(Some(1)).await.unwrap().len(), 1);
        assert_eq!(storage.list_users(Some(0)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let storage = MemoryStorage::new();
        storage.create_user(new_user("alice")).await.unwrap();

        let err = storage.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(ref m) if m == "Username already taken"));

        let mut same_email = new_user("alice2");
        same_email.email = "alice@example.com".to_string();
        let err = storage.create_user(same_email).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(ref m) if m == "Email already registered"));

        assert_eq!(storage.list_users(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_reports_missing() {
        let storage = MemoryStorage::new();
        let alice = storage.create_user(new_user("alice")).await.unwrap();

        let updated = storage
            .update_user(
                alice.id,
                UserPatch {
                    is_artisan: Some(true),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_artisan);
        assert_eq!(updated.email, alice.email);
        assert_eq!(storage.get_user(alice.id).await.unwrap(), Some(updated));

        let missing = storage
            .update_user(RecordId::new(42), UserPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_artisan_profile() {
        let storage = MemoryStorage::new();
        let profile = storage
            .create_artisan_profile(NewArtisanProfile {
                user_id: RecordId::new(1),
                craft: Some("Weaving".to_string()),
                experience: Some("10 years".to_string()),
                story: None,
                social_media: None,
                skills: None,
            })
            .await
            .unwrap();

        let updated = storage
            .update_artisan_profile(
                profile.id,
                ArtisanProfilePatch {
                    verified: Some(true),
                    story: Some("Learned from my grandmother".to_string()),
                    ..ArtisanProfilePatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.verified);
        assert_eq!(updated.craft.as_deref(), Some("Weaving"));
        assert_eq!(updated.experience.as_deref(), Some("10 years"));
        assert_eq!(storage.get_artisan_profile(profile.id).await.unwrap(), Some(updated));

        assert!(storage
            .update_artisan_profile(RecordId::new(9), ArtisanProfilePatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_category_and_product() {
        let storage = MemoryStorage::new();
        let pottery = storage.create_category(category("Pottery")).await.unwrap();
        let product = storage
            .create_product(NewProduct {
                name: "Vase".to_string(),
                description: "Wheel thrown terracotta.".to_string(),
                price: 450.0,
                category_id: pottery.id,
                image_url: None,
                stock: Some(3),
                artisan_id: RecordId::new(1),
                featured: None,
            })
            .await
            .unwrap();

        let renamed = storage
            .update_category(
                pottery.id,
                CategoryPatch {
                    description: Some("Clay and terracotta".to_string()),
                    ..CategoryPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Pottery");
        assert_eq!(renamed.description.as_deref(), Some("Clay and terracotta"));
        assert!(storage
            .update_category(RecordId::new(9), CategoryPatch::default())
            .await
            .unwrap()
            .is_none());

        let restocked = storage
            .update_product(
                product.id,
                ProductPatch {
                    stock: Some(10),
                    featured: Some(true),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restocked.stock, 10);
        assert!(restocked.featured);
        assert_eq!(restocked.price, 450.0);
        assert_eq!(restocked.created_at, product.created_at);
        assert_eq!(storage.get_product(product.id).await.unwrap(), Some(restocked));
        assert!(storage
            .update_product(RecordId::new(9), ProductPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_forum_post_and_reply() {
        let storage = MemoryStorage::new();
        let post = storage
            .create_forum_post(NewForumPost {
                title: "Natural dyes".to_string(),
                content: "Where do you source indigo?".to_string(),
                user_id: RecordId::new(1),
                category: Some("Materials".to_string()),
            })
            .await
            .unwrap();
        let reply = storage
            .create_forum_reply(NewForumReply {
                content: "Try Bagru.".to_string(),
                post_id: post.id,
                user_id: RecordId::new(2),
            })
            .await
            .unwrap();

        let edited = storage
            .update_forum_post(
                post.id,
                ForumPostPatch {
                    title: Some("Natural indigo dyes".to_string()),
                    ..ForumPostPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.title, "Natural indigo dyes");
        assert_eq!(edited.content, post.content);
        assert_eq!(edited.category.as_deref(), Some("Materials"));
        assert!(storage
            .update_forum_post(RecordId::new(9), ForumPostPatch::default())
            .await
            .unwrap()
            .is_none());

        let edited_reply = storage
            .update_forum_reply(
                reply.id,
                ForumReplyPatch {
                    content: Some("Try the Bagru cooperative.".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited_reply.post_id, post.id);
        assert_eq!(storage.get_forum_reply(reply.id).await.unwrap(), Some(edited_reply));
        assert!(storage
            .update_forum_reply(RecordId::new(9), ForumReplyPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_one_profile_per_user() {
        let storage = MemoryStorage::new();
        let profile = || NewArtisanProfile {
            user_id: RecordId::new(1),
            craft: Some("Weaving".to_string()),
            experience: None,
            story: None,
            social_media: None,
            skills: None,
        };

        let created = storage.create_artisan_profile(profile()).await.unwrap();
        assert_eq!(
            storage.get_artisan_profile_by_user(RecordId::new(1)).await.unwrap(),
            Some(created)
        );
        assert!(matches!(
            storage.create_artisan_profile(profile()).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_products_by_foreign_key() {
        let storage = MemoryStorage::new();
        let pottery = storage.create_category(category("Pottery")).await.unwrap();
        let textiles = storage.create_category(category("Textiles")).await.unwrap();

        for (name, category_id, artisan) in [
            ("Vase", pottery.id, 1),
            ("Bowl", pottery.id, 2),
            ("Shawl", textiles.id, 1),
        ] {
            storage
                .create_product(NewProduct {
                    name: name.to_string(),
                    description: "Handmade in small batches.".to_string(),
                    price: 100.0,
                    category_id,
                    image_url: None,
                    stock: None,
                    artisan_id: RecordId::new(artisan),
                    featured: None,
                })
                .await
                .unwrap();
        }

        let by_category = storage.list_products_by_category(pottery.id).await.unwrap();
        assert_eq!(by_category.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["Vase", "Bowl"]);

        let by_artisan = storage.list_products_by_artisan(RecordId::new(1)).await.unwrap();
        assert_eq!(by_artisan.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["Vase", "Shawl"]);
    }

    #[tokio::test]
    async fn test_forum_replies_by_post() {
        let storage = MemoryStorage::new();
        let post = storage
            .create_forum_post(NewForumPost {
                title: "Natural dyes".to_string(),
                content: "Where do you source indigo?".to_string(),
                user_id: RecordId::new(1),
                category: None,
            })
            .await
            .unwrap();

        for content in ["Try Bagru.", "Sanganer too."] {
            storage
                .create_forum_reply(NewForumReply {
                    content: content.to_string(),
                    post_id: post.id,
                    user_id: RecordId::new(2),
                })
                .await
                .unwrap();
        }

        assert_eq!(storage.list_forum_replies(post.id).await.unwrap().len(), 2);
        assert!(storage.list_forum_replies(RecordId::new(7)).await.unwrap().is_empty());
        assert_eq!(storage.list_forum_posts_by_user(RecordId::new(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_unique_ids() {
        let storage = Arc::new(MemoryStorage::new());
        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    storage.create_category(category(&format!("Craft {i}"))).await.unwrap().id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
        assert_eq!(storage.list_categories(None).await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("store.json");

        let storage = MemoryStorage::open(&path).await.unwrap();
        assert_eq!(storage.backend(), BackendKind::File);
        let alice = storage.create_user(new_user("alice")).await.unwrap();
        storage.create_category(category("Pottery")).await.unwrap();
        drop(storage);

        let reopened = MemoryStorage::open(&path).await.unwrap();
        assert_eq!(reopened.get_user(alice.id).await.unwrap(), Some(alice));
        assert_eq!(reopened.list_categories(None).await.unwrap().len(), 1);

        let bob = reopened.create_user(new_user("bob")).await.unwrap();
        assert_eq!(bob.id, RecordId::new(2));
    }

    #[tokio::test]
    async fn test_failed_write_is_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let storage = MemoryStorage::open(&path).await.unwrap();
        storage.create_user(new_user("alice")).await.unwrap();

        assert!(storage.create_user(new_user("alice")).await.is_err());
        let reopened = MemoryStorage::open(&path).await.unwrap();
        assert_eq!(reopened.list_users(None).await.unwrap().len(), 1);
    }
}
