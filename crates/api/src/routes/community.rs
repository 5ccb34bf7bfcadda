//! Community post routes

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

use super::teams::UserBrief;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCommunityPostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub user: UserBrief,
    pub content: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPostView {
    pub id: Uuid,
    pub user: UserBrief,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentView>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPostListData {
    pub posts: Vec<CommunityPostView>,
    pub count: usize,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct CommunityPostRow {
    id: Uuid,
    title: String,
    content: String,
    tags: Vec<String>,
    likes: Vec<Uuid>,
    user_id: Uuid,
    username: String,
    email: String,
    full_name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    content: String,
    user_id: Uuid,
    username: String,
    email: String,
    full_name: String,
    created_at: OffsetDateTime,
}

const COMMUNITY_POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.tags,
           ARRAY(SELECT l.user_id FROM community_post_likes l WHERE l.post_id = p.id) AS likes,
           u.id AS user_id, u.username, u.email, u.full_name,
           p.created_at, p.updated_at
    FROM community_posts p
    JOIN users u ON u.id = p.user_id
"#;

// =============================================================================
// Handlers
// =============================================================================

/// Publish a community post
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateCommunityPostRequest>,
) -> ApiResult<Envelope<CommunityPostView>> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    let post_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO community_posts (id, user_id, title, content, tags) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(post_id)
    .bind(user.id)
    .bind(req.title.trim())
    .bind(req.content.trim())
    .bind(&req.tags)
    .execute(&state.pool)
    .await?;

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::created(post, "Community post created successfully"))
}

/// List all community posts, newest first
pub async fn get_posts(
    State(state): State<AppState>,
) -> ApiResult<Envelope<CommunityPostListData>> {
    let rows: Vec<CommunityPostRow> =
        sqlx::query_as(&format!("{COMMUNITY_POST_SELECT} ORDER BY p.created_at DESC"))
            .fetch_all(&state.pool)
            .await?;

    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        let comments = fetch_comments(&state.pool, row.id).await?;
        posts.push(build_view(row, comments));
    }
    let count = posts.len();

    Ok(Envelope::ok(
        CommunityPostListData { posts, count },
        "Community posts fetched successfully",
    ))
}

/// Fetch a single community post with its comments
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<CommunityPostView>> {
    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Community post not found".to_string()))?;
    Ok(Envelope::ok(post, "Community post fetched successfully"))
}

/// Like a community post
pub async fn like_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<CommunityPostView>> {
    let post: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM community_posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?;
    post.ok_or_else(|| ApiError::NotFound("Community post not found".to_string()))?;

    let inserted = sqlx::query(
        "INSERT INTO community_post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(ApiError::BadRequest("Post already liked".to_string()));
    }

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::ok(post, "Post liked successfully"))
}

/// Remove a like from a community post
pub async fn unlike_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<CommunityPostView>> {
    let removed =
        sqlx::query("DELETE FROM community_post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user.id)
            .execute(&state.pool)
            .await?;

    if removed.rows_affected() == 0 {
        return Err(ApiError::BadRequest("Post not liked".to_string()));
    }

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Community post not found".to_string()))?;
    Ok(Envelope::ok(post, "Post unliked successfully"))
}

/// Comment on a community post
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<Envelope<CommunityPostView>> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment content is required".to_string()));
    }

    let post: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM community_posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?;
    post.ok_or_else(|| ApiError::NotFound("Community post not found".to_string()))?;

    sqlx::query(
        "INSERT INTO community_comments (id, post_id, user_id, content) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(user.id)
    .bind(req.content.trim())
    .execute(&state.pool)
    .await?;

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::created(post, "Comment added successfully"))
}

/// Delete a community post. Author only.
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<serde_json::Value>> {
    let post: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM community_posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&state.pool)
            .await?;
    let (author_id,) =
        post.ok_or_else(|| ApiError::NotFound("Community post not found".to_string()))?;

    if author_id != user.id {
        return Err(ApiError::Forbidden);
    }

    sqlx::query("DELETE FROM community_posts WHERE id = $1")
        .bind(post_id)
        .execute(&state.pool)
        .await?;

    Ok(Envelope::ok(
        serde_json::json!({}),
        "Community post deleted successfully",
    ))
}

// =============================================================================
// Helpers
// =============================================================================

fn build_view(row: CommunityPostRow, comments: Vec<CommentView>) -> CommunityPostView {
    CommunityPostView {
        id: row.id,
        user: UserBrief {
            id: row.user_id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
        },
        title: row.title,
        content: row.content,
        tags: row.tags,
        likes: row.likes,
        comments,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

async fn fetch_post(pool: &PgPool, post_id: Uuid) -> ApiResult<Option<CommunityPostView>> {
    let row: Option<CommunityPostRow> =
        sqlx::query_as(&format!("{COMMUNITY_POST_SELECT} WHERE p.id = $1"))
            .bind(post_id)
            .fetch_optional(pool)
            .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let comments = fetch_comments(pool, post_id).await?;
    Ok(Some(build_view(row, comments)))
}

async fn fetch_comments(pool: &PgPool, post_id: Uuid) -> ApiResult<Vec<CommentView>> {
    let rows: Vec<CommentRow> = sqlx::query_as(
        r#"
        SELECT c.id, c.content, u.id AS user_id, u.username, u.email, u.full_name, c.created_at
        FROM community_comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.post_id = $1
        ORDER BY c.created_at
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|c| CommentView {
            id: c.id,
            user: UserBrief {
                id: c.user_id,
                username: c.username,
                email: c.email,
                full_name: c.full_name,
            },
            content: c.content,
            created_at: c.created_at,
        })
        .collect())
}
