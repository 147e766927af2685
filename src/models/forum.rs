use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;
use super::user::AuthorSummary;
use super::validation::{Validate, Validator};
use super::{merge, merge_optional, Patch, Record, RecordId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: RecordId,
    pub title: String,
    pub content: String,
    pub user_id: RecordId,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for ForumPost {
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ForumReply {
    pub id: RecordId,
    pub content: String,
    pub post_id: RecordId,
    pub user_id: RecordId,
    pub created_at: DateTime<Utc>,
}

impl Record for ForumReply {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// Body of `POST /api/forum`; the author is the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ForumPostRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

impl Validate for ForumPostRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("title", &self.title, 3, Some(150))
            .length("content", &self.content, 10, None);
        v.finish("Invalid post data")
    }
}

#[derive(Debug, Clone)]
pub struct NewForumPost {
    pub title: String,
    pub content: String,
    pub user_id: RecordId,
    pub category: Option<String>,
}

impl NewForumPost {
    pub fn by_author(user_id: RecordId, request: ForumPostRequest) -> Self {
        Self {
            title: request.title,
            content: request.content,
            user_id,
            category: request.category,
        }
    }

    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> ForumPost {
        ForumPost {
            id,
            title: self.title,
            content: self.content,
            user_id: self.user_id,
            category: self.category,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForumPostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

impl Patch<ForumPost> for ForumPostPatch {
    fn apply_to(self, post: &mut ForumPost) {
        merge(&mut post.title, self.title);
        merge(&mut post.content, self.content);
        merge_optional(&mut post.category, self.category);
    }
}

/// Body of a reply. `postId` is required on `/api/forum/replies` and
/// ignored when the post comes from the path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumReplyRequest {
    pub content: String,
    pub post_id: Option<RecordId>,
}

impl Validate for ForumReplyRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("content", &self.content, 2, None);
        if let Some(post_id) = self.post_id {
            v.check("postId", post_id.is_valid(), "must be a positive integer");
        }
        v.finish("Invalid reply data")
    }
}

#[derive(Debug, Clone)]
pub struct NewForumReply {
    pub content: String,
    pub post_id: RecordId,
    pub user_id: RecordId,
}

impl NewForumReply {
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> ForumReply {
        ForumReply {
            id,
            content: self.content,
            post_id: self.post_id,
            user_id: self.user_id,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForumReplyPatch {
    pub content: Option<String>,
}

impl Patch<ForumReply> for ForumReplyPatch {
    fn apply_to(self, reply: &mut ForumReply) {
        merge(&mut reply.content, self.content);
    }
}

/// Post as shown in the forum index
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostSummary {
    #[serde(flatten)]
    pub post: ForumPost,
    pub reply_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: ForumPost,
    pub author: Option<AuthorSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyWithAuthor {
    #[serde(flatten)]
    pub reply: ForumReply,
    pub author: Option<AuthorSummary>,
}

/// A post with its replies, as returned by `GET /api/forum/posts/:id`
#[derive(Debug, Clone, Serialize)]
pub struct ForumThread {
    pub post: PostWithAuthor,
    pub replies: Vec<ReplyWithAuthor>,
}
