use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, Transaction};
use std::time::Duration;

use super::{BackendKind, Storage, StorageError, StorageResult};
use crate::models::artisan::{ArtisanProfile, ArtisanProfilePatch, NewArtisanProfile};
use crate::models::catalog::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};
use crate::models::event::{Event, EventPatch, NewEvent};
use crate::models::forum::{
    ForumPost, ForumPostPatch, ForumReply, ForumReplyPatch, NewForumPost, NewForumReply,
};
use crate::models::user::{NewUser, User, UserPatch};
use crate::models::{Patch, RecordId};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    profile_picture TEXT,
    bio TEXT,
    is_artisan BOOLEAN NOT NULL DEFAULT FALSE,
    location TEXT,
    contact_info TEXT,
    join_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS artisan_profiles (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL UNIQUE REFERENCES users(id),
    craft TEXT,
    experience TEXT,
    story TEXT,
    verified BOOLEAN NOT NULL DEFAULT FALSE,
    social_media TEXT,
    skills TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS categories (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    image_url TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS products (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    price DOUBLE PRECISION NOT NULL,
    image_url TEXT,
    category_id BIGINT REFERENCES categories(id),
    artisan_id BIGINT NOT NULL REFERENCES users(id),
    stock BIGINT NOT NULL DEFAULT 0,
    featured BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS events (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    start_date TIMESTAMPTZ NOT NULL,
    end_date TIMESTAMPTZ,
    location TEXT,
    image_url TEXT,
    organizer TEXT,
    event_type TEXT,
    price DOUBLE PRECISION,
    featured BOOLEAN NOT NULL DEFAULT FALSE,
    created_by BIGINT REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS forum_posts (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users(id),
    category TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS forum_replies (
    id BIGSERIAL PRIMARY KEY,
    content TEXT NOT NULL,
    post_id BIGINT NOT NULL REFERENCES forum_posts(id),
    user_id BIGINT NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(conflict_message(db.constraint()))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::Conflict(
                format!(
                    "Referenced record does not exist ({})",
                    db.constraint().unwrap_or("foreign key")
                ),
            ),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StorageError::Unavailable(error.to_string()),
            _ => StorageError::Backend(error.to_string()),
        }
    }
}

fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_username_key") => "Username already taken",
        Some("users_email_key") => "Email already registered",
        Some("artisan_profiles_user_id_key") => "Artisan profile already exists",
        _ => "Record already exists",
    }
    .to_string()
}

fn sql_limit(limit: Option<usize>) -> Option<i64> {
    limit
        .filter(|&n| n > 0)
        .map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}

/// PostgreSQL backend. Tables are created on connect when missing.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connects with `timeout` bounding both connect and pool acquire.
    pub async fn connect(url: &str, max_connections: u32, timeout: Duration) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(timeout)
            .connect(url)
            .await?;

        let storage = Self::from_pool(pool);
        storage.bootstrap().await?;
        Ok(storage)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn bootstrap(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::debug!("PostgreSQL schema is in place");
        Ok(())
    }

    async fn fetch_list<T>(&self, table: &str, limit: Option<usize>) -> StorageResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} ORDER BY id LIMIT $1", table);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn fetch_by_id<T>(&self, table: &str, id: RecordId) -> StorageResult<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE id = $1", table);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn fetch_one_where<T, V>(&self, table: &str, column: &str, value: V) -> StorageResult<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        V: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!("SELECT * FROM {} WHERE {} = $1 ORDER BY id LIMIT 1", table, column);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn fetch_all_where<T>(&self, table: &str, column: &str, id: RecordId) -> StorageResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!("SELECT * FROM {} WHERE {} = $1 ORDER BY id", table, column);
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?)
    }
}

/// Reads a row under `FOR UPDATE` so the merge and write see no interleaving.
async fn lock_row<T>(
    tx: &mut Transaction<'static, Postgres>,
    table: &str,
    id: RecordId,
) -> StorageResult<Option<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} WHERE id = $1 FOR UPDATE", table);
    Ok(sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?)
}

#[async_trait]
impl Storage for PostgresStorage {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_users(&self, limit: Option<usize>) -> StorageResult<Vec<User>> {
        self.fetch_list("users", limit).await
    }

    async fn get_user(&self, id: RecordId) -> StorageResult<Option<User>> {
        self.fetch_by_id("users", id).await
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        self.fetch_one_where("users", "username", username.to_string()).await
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.fetch_one_where("users", "email", email.to_string()).await
    }

    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password, first_name, last_name, is_artisan, location, bio)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.is_artisan)
        .bind(user.location)
        .bind(user.bio)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_user(&self, id: RecordId, patch: UserPatch) -> StorageResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut user) = lock_row::<User>(&mut tx, "users", id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut user);

        let updated = sqlx::query_as::<_, User>(
            "UPDATE users SET email = $2, password = $3, first_name = $4, last_name = $5,
                profile_picture = $6, bio = $7, is_artisan = $8, location = $9, contact_info = $10
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(user.email)
        .bind(user.password)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.profile_picture)
        .bind(user.bio)
        .bind(user.is_artisan)
        .bind(user.location)
        .bind(user.contact_info)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_artisan_profiles(&self, limit: Option<usize>) -> StorageResult<Vec<ArtisanProfile>> {
        self.fetch_list("artisan_profiles", limit).await
    }

    async fn get_artisan_profile(&self, id: RecordId) -> StorageResult<Option<ArtisanProfile>> {
        self.fetch_by_id("artisan_profiles", id).await
    }

    async fn get_artisan_profile_by_user(
        &self,
        user_id: RecordId,
    ) -> StorageResult<Option<ArtisanProfile>> {
        self.fetch_one_where("artisan_profiles", "user_id", user_id).await
    }

    async fn create_artisan_profile(
        &self,
        profile: NewArtisanProfile,
    ) -> StorageResult<ArtisanProfile> {
        let created = sqlx::query_as::<_, ArtisanProfile>(
            "INSERT INTO artisan_profiles (user_id, craft, experience, story, social_media, skills)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(profile.user_id)
        .bind(profile.craft)
        .bind(profile.experience)
        .bind(profile.story)
        .bind(profile.social_media)
        .bind(profile.skills)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_artisan_profile(
        &self,
        id: RecordId,
        patch: ArtisanProfilePatch,
    ) -> StorageResult<Option<ArtisanProfile>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut profile) = lock_row::<ArtisanProfile>(&mut tx, "artisan_profiles", id).await?
        else {
            return Ok(None);
        };
        patch.apply_to(&mut profile);

        let updated = sqlx::query_as::<_, ArtisanProfile>(
            "UPDATE artisan_profiles SET craft = $2, experience = $3, story = $4, verified = $5,
                social_media = $6, skills = $7
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(profile.craft)
        .bind(profile.experience)
        .bind(profile.story)
        .bind(profile.verified)
        .bind(profile.social_media)
        .bind(profile.skills)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_categories(&self, limit: Option<usize>) -> StorageResult<Vec<Category>> {
        self.fetch_list("categories", limit).await
    }

    async fn get_category(&self, id: RecordId) -> StorageResult<Option<Category>> {
        self.fetch_by_id("categories", id).await
    }

    async fn create_category(&self, category: NewCategory) -> StorageResult<Category> {
        let created = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description, image_url)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(category.name)
        .bind(category.description)
        .bind(category.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_category(
        &self,
        id: RecordId,
        patch: CategoryPatch,
    ) -> StorageResult<Option<Category>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut category) = lock_row::<Category>(&mut tx, "categories", id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut category);

        let updated = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, description = $3, image_url = $4
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(category.name)
        .bind(category.description)
        .bind(category.image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_products(&self, limit: Option<usize>) -> StorageResult<Vec<Product>> {
        self.fetch_list("products", limit).await
    }

    async fn get_product(&self, id: RecordId) -> StorageResult<Option<Product>> {
        self.fetch_by_id("products", id).await
    }

    async fn list_products_by_category(&self, category_id: RecordId) -> StorageResult<Vec<Product>> {
        self.fetch_all_where("products", "category_id", category_id).await
    }

    async fn list_products_by_artisan(&self, artisan_id: RecordId) -> StorageResult<Vec<Product>> {
        self.fetch_all_where("products", "artisan_id", artisan_id).await
    }

    async fn create_product(&self, product: NewProduct) -> StorageResult<Product> {
        let created = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, description, price, image_url, category_id, artisan_id, stock, featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image_url)
        .bind(product.category_id)
        .bind(product.artisan_id)
        .bind(product.stock.unwrap_or(0))
        .bind(product.featured.unwrap_or(false))
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_product(&self, id: RecordId, patch: ProductPatch) -> StorageResult<Option<Product>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut product) = lock_row::<Product>(&mut tx, "products", id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut product);

        let updated = sqlx::query_as::<_, Product>(
            "UPDATE products SET name = $2, description = $3, price = $4, image_url = $5,
                category_id = $6, stock = $7, featured = $8
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image_url)
        .bind(product.category_id)
        .bind(product.stock)
        .bind(product.featured)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<Event>> {
        self.fetch_list("events", limit).await
    }

    async fn get_event(&self, id: RecordId) -> StorageResult<Option<Event>> {
        self.fetch_by_id("events", id).await
    }

    async fn create_event(&self, event: NewEvent) -> StorageResult<Event> {
        let created = sqlx::query_as::<_, Event>(
            "INSERT INTO events (title, description, start_date, end_date, location, image_url,
                organizer, event_type, price, featured, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(event.title)
        .bind(event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.location)
        .bind(event.image_url)
        .bind(event.organizer)
        .bind(event.event_type)
        .bind(event.price)
        .bind(event.featured)
        .bind(event.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_event(&self, id: RecordId, patch: EventPatch) -> StorageResult<Option<Event>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut event) = lock_row::<Event>(&mut tx, "events", id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut event);

        let updated = sqlx::query_as::<_, Event>(
            "UPDATE events SET title = $2, description = $3, start_date = $4, end_date = $5,
                location = $6, image_url = $7, organizer = $8, event_type = $9, price = $10,
                featured = $11
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(event.title)
        .bind(event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.location)
        .bind(event.image_url)
        .bind(event.organizer)
        .bind(event.event_type)
        .bind(event.price)
        .bind(event.featured)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_forum_posts(&self, limit: Option<usize>) -> StorageResult<Vec<ForumPost>> {
        self.fetch_list("forum_posts", limit).await
    }

    async fn get_forum_post(&self, id: RecordId) -> StorageResult<Option<ForumPost>> {
        self.fetch_by_id("forum_posts", id).await
    }

    async fn list_forum_posts_by_user(&self, user_id: RecordId) -> StorageResult<Vec<ForumPost>> {
        self.fetch_all_where("forum_posts", "user_id", user_id).await
    }

    async fn create_forum_post(&self, post: NewForumPost) -> StorageResult<ForumPost> {
        let created = sqlx::query_as::<_, ForumPost>(
            "INSERT INTO forum_posts (title, content, user_id, category)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(post.title)
        .bind(post.content)
        .bind(post.user_id)
        .bind(post.category)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_forum_post(
        &self,
        id: RecordId,
        patch: ForumPostPatch,
    ) -> StorageResult<Option<ForumPost>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut post) = lock_row::<ForumPost>(&mut tx, "forum_posts", id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut post);

        let updated = sqlx::query_as::<_, ForumPost>(
            "UPDATE forum_posts SET title = $2, content = $3, category = $4
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(post.title)
        .bind(post.content)
        .bind(post.category)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn get_forum_reply(&self, id: RecordId) -> StorageResult<Option<ForumReply>> {
        self.fetch_by_id("forum_replies", id).await
    }

    async fn list_forum_replies(&self, post_id: RecordId) -> StorageResult<Vec<ForumReply>> {
        self.fetch_all_where("forum_replies", "post_id", post_id).await
    }

    async fn create_forum_reply(&self, reply: NewForumReply) -> StorageResult<ForumReply> {
        let created = sqlx::query_as::<_, ForumReply>(
            "INSERT INTO forum_replies (content, post_id, user_id)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(reply.content)
        .bind(reply.post_id)
        .bind(reply.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_forum_reply(
        &self,
        id: RecordId,
        patch: ForumReplyPatch,
    ) -> StorageResult<Option<ForumReply>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut reply) = lock_row::<ForumReply>(&mut tx, "forum_replies", id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut reply);

        let updated = sqlx::query_as::<_, ForumReply>(
            "UPDATE forum_replies SET content = $2
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(reply.content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }
}
