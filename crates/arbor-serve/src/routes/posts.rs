//! Post endpoints: batch create, listing, single fetch, and edit.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arbor_core::{Post, PostDraft, PostQuery, SortMode, ThreadRef};

use crate::error::ApiError;
use crate::state::AppState;

// ═══════════════════════════════════════════════════════════════════════════
// Request / Response Types
// ═══════════════════════════════════════════════════════════════════════════

/// Wire shape of a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    /// Post id.
    pub id: i64,
    /// Owning thread id.
    pub thread: i64,
    /// Forum slug.
    pub forum: String,
    /// Author nickname.
    pub author: String,
    /// Parent post id, omitted for root posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<i64>,
    /// Message body.
    pub message: String,
    /// True once an edit changed the message.
    pub is_edited: bool,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            thread: post.thread_id,
            forum: post.forum_slug,
            author: post.author,
            parent: post.parent_id,
            message: post.message,
            is_edited: post.is_edited,
            created: post.created_at,
        }
    }
}

/// One post to create.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostBody {
    /// Author nickname; must exist.
    pub author: String,
    /// Message body.
    pub message: String,
    /// Optional parent post id within the same thread.
    #[serde(default)]
    pub parent: Option<i64>,
}

/// Query parameters for post listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListPostsQuery {
    /// Maximum rows (flat/tree) or root groups (parent_tree). 0 = all.
    pub limit: Option<i64>,
    /// Resume strictly after (before, with `desc`) this post id.
    pub since: Option<i64>,
    /// Sort mode: flat (default), tree, parent_tree.
    pub sort: Option<String>,
    /// Reverse the listing order.
    pub desc: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Endpoints
// ═══════════════════════════════════════════════════════════════════════════

/// `POST /api/v1/threads/{thread}/posts`
///
/// Creates a batch of posts in one atomic transaction and returns them in
/// request order. An empty array is a successful no-op.
pub async fn create_posts(
    State(state): State<AppState>,
    Path(thread): Path<String>,
    Json(body): Json<Vec<CreatePostBody>>,
) -> Result<(StatusCode, Json<Vec<PostView>>), ApiError> {
    let thread = ThreadRef::parse(&thread);
    let drafts: Vec<PostDraft> = body
        .into_iter()
        .map(|b| PostDraft {
            author: b.author,
            message: b.message,
            parent: b.parent,
        })
        .collect();

    let created = state.store.create_posts(&thread, &drafts).await?;
    let views = created.into_iter().map(PostView::from).collect();
    Ok((StatusCode::CREATED, Json(views)))
}

/// `GET /api/v1/threads/{thread}/posts`
///
/// Lists a thread's posts in the requested order.
pub async fn list_posts(
    State(state): State<AppState>,
    Path(thread): Path<String>,
    Query(params): Query<ListPostsQuery>,
) -> Result<Json<Vec<PostView>>, ApiError> {
    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<SortMode>()?,
        None => SortMode::default(),
    };
    let query = PostQuery {
        limit: params.limit.unwrap_or(0),
        since: params.since,
        sort,
        desc: params.desc.unwrap_or(false),
    };

    let posts = state
        .store
        .get_posts(&ThreadRef::parse(&thread), &query)
        .await?;
    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

/// `GET /api/v1/posts/{id}`
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostView>, ApiError> {
    let post = state.store.get_post(id).await?;
    Ok(Json(post.into()))
}

/// Body for the edit endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EditPostBody {
    /// New message body; omitting it leaves the post untouched.
    #[serde(default)]
    pub message: Option<String>,
}

/// `PATCH /api/v1/posts/{id}`
///
/// Updates the message; `is_edited` flips only when the text actually
/// changes.
pub async fn edit_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EditPostBody>,
) -> Result<Json<PostView>, ApiError> {
    let post = state.store.edit_post(id, body.message.as_deref()).await?;
    Ok(Json(post.into()))
}
