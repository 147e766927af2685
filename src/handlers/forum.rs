use axum::extract::State;
use std::collections::HashMap;

use crate::middleware::auth::AuthUser;
use crate::models::errors::AppError;
use crate::models::forum::{
    ForumPost, ForumPostRequest, ForumPostSummary, ForumReply, ForumReplyRequest, ForumThread,
    NewForumPost, NewForumReply, PostWithAuthor, ReplyWithAuthor,
};
use crate::models::response::{created, list, ok, ApiResult, CreatedResult, ListParams};
use crate::models::user::AuthorSummary;
use crate::models::validation::{ApiPath, ApiQuery, FieldError, ValidatedJson};
use crate::models::RecordId;
use crate::AppState;

pub async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Vec<ForumPostSummary>> {
    let posts = state.storage.list_forum_posts(params.limit()?).await?;

    let mut summaries = Vec::with_capacity(posts.len());
    for post in posts {
        let reply_count = state.storage.list_forum_replies(post.id).await?.len();
        summaries.push(ForumPostSummary { post, reply_count });
    }
    list(summaries)
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<ForumPostRequest>,
) -> CreatedResult<ForumPost> {
    let post = state
        .storage
        .create_forum_post(NewForumPost::by_author(user.id, request))
        .await?;
    tracing::info!(post_id = %post.id, user_id = %user.id, "Created forum post");
    created(post)
}

/// A post with its replies, each carrying its author's summary.
pub async fn get_thread(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<ForumThread> {
    let id = RecordId::parse(&raw_id, "post")?;
    let post = state
        .storage
        .get_forum_post(id)
        .await?
        .ok_or_else(|| AppError::not_found("Forum post"))?;
    let replies = state.storage.list_forum_replies(id).await?;

    let mut authors: HashMap<RecordId, Option<AuthorSummary>> = HashMap::new();
    for user_id in std::iter::once(post.user_id).chain(replies.iter().map(|r| r.user_id)) {
        if !authors.contains_key(&user_id) {
            let author = state.storage.get_user(user_id).await?;
            authors.insert(user_id, author.as_ref().map(AuthorSummary::from));
        }
    }
    let author_of = |user_id: RecordId| authors.get(&user_id).cloned().flatten();

    ok(ForumThread {
        post: PostWithAuthor {
            author: author_of(post.user_id),
            post,
        },
        replies: replies
            .into_iter()
            .map(|reply| ReplyWithAuthor {
                author: author_of(reply.user_id),
                reply,
            })
            .collect(),
    })
}

/// `POST /api/forum/replies`: the post comes from `postId` in the body.
pub async fn create_reply(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(request): ValidatedJson<ForumReplyRequest>,
) -> CreatedResult<ForumReply> {
    let post_id = request.post_id.ok_or_else(|| {
        AppError::validation_failed(
            "Invalid reply data",
            vec![FieldError::new("postId", "Required")],
        )
    })?;
    add_reply(&state, user.id, post_id, request.content).await
}

/// `POST /api/forum/:id/reply` and `/api/forum/posts/:id/replies`: the path names the post.
pub async fn create_reply_for_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(raw_id): ApiPath<String>,
    ValidatedJson(request): ValidatedJson<ForumReplyRequest>,
) -> CreatedResult<ForumReply> {
    let post_id = RecordId::parse(&raw_id, "post")?;
    add_reply(&state, user.id, post_id, request.content).await
}

async fn add_reply(
    state: &AppState,
    user_id: RecordId,
    post_id: RecordId,
    content: String,
) -> CreatedResult<ForumReply> {
    if state.storage.get_forum_post(post_id).await?.is_none() {
        return Err(AppError::not_found("Forum post"));
    }

    let reply = state
        .storage
        .create_forum_reply(NewForumReply {
            content,
            post_id,
            user_id,
        })
        .await?;
    tracing::info!(reply_id = %reply.id, post_id = %post_id, "Created forum reply");
    created(reply)
}
