//! Team post routes

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
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    pub team_id: Uuid,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub user: UserBrief,
    pub team_id: Uuid,
    pub link: Option<String>,
    pub likes: Vec<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListData {
    pub posts: Vec<PostView>,
    pub count: usize,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    description: String,
    team_id: Uuid,
    link: Option<String>,
    user_id: Uuid,
    username: String,
    email: String,
    full_name: String,
    likes: Vec<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PostRow> for PostView {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            user: UserBrief {
                id: row.user_id,
                username: row.username,
                email: row.email,
                full_name: row.full_name,
            },
            team_id: row.team_id,
            link: row.link,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PostAuthorRow {
    user_id: Uuid,
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.description, p.team_id, p.link,
           u.id AS user_id, u.username, u.email, u.full_name,
           ARRAY(SELECT l.user_id FROM post_likes l WHERE l.post_id = p.id) AS likes,
           p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

// =============================================================================
// Handlers
// =============================================================================

/// Create a post inside a team
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<Envelope<PostView>> {
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title, description, and team ID are required".to_string(),
        ));
    }

    let team: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE id = $1")
        .bind(req.team_id)
        .fetch_optional(&state.pool)
        .await?;
    team.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let post_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO posts (id, title, description, user_id, team_id, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(post_id)
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(user.id)
    .bind(req.team_id)
    .bind(req.link.as_deref())
    .execute(&state.pool)
    .await?;

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::created(post, "Post created successfully"))
}

/// List a team's posts, newest first
pub async fn get_posts_by_team(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Envelope<PostListData>> {
    let rows: Vec<PostRow> =
        sqlx::query_as(&format!("{POST_SELECT} WHERE p.team_id = $1 ORDER BY p.created_at DESC"))
            .bind(team_id)
            .fetch_all(&state.pool)
            .await?;

    let posts: Vec<PostView> = rows.into_iter().map(PostView::from).collect();
    let count = posts.len();

    Ok(Envelope::ok(
        PostListData { posts, count },
        "Posts fetched successfully",
    ))
}

/// Fetch a single post
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<PostView>> {
    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Envelope::ok(post, "Post fetched successfully"))
}

/// Update a post. Author only.
pub async fn update_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<Envelope<PostView>> {
    require_author(&state.pool, post_id, user.id).await?;

    sqlx::query(
        r#"
        UPDATE posts
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            link = COALESCE($3, link),
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(req.description.as_deref().map(str::trim))
    .bind(req.link.as_deref())
    .bind(post_id)
    .execute(&state.pool)
    .await?;

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::ok(post, "Post updated successfully"))
}

/// Delete a post. Author only.
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<serde_json::Value>> {
    require_author(&state.pool, post_id, user.id).await?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&state.pool)
        .await?;

    Ok(Envelope::ok(
        serde_json::json!({}),
        "Post deleted successfully",
    ))
}

/// Like a post
pub async fn like_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<PostView>> {
    let post: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?;
    post.ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let inserted = sqlx::query(
        "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
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

/// Remove a like from a post
pub async fn unlike_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Envelope<PostView>> {
    let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    if removed.rows_affected() == 0 {
        return Err(ApiError::BadRequest("Post not liked".to_string()));
    }

    let post = fetch_post(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Envelope::ok(post, "Post unliked successfully"))
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_post(pool: &PgPool, post_id: Uuid) -> ApiResult<Option<PostView>> {
    let row: Option<PostRow> = sqlx::query_as(&format!("{POST_SELECT} WHERE p.id = $1"))
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(PostView::from))
}

async fn require_author(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let post: Option<PostAuthorRow> =
        sqlx::query_as("SELECT user_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;
    let post = post.ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if post.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
