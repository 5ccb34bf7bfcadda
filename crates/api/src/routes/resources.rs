//! Shared resource routes
//!
//! Uploads stage the file on local disk, hand it to the object storage
//! client, and persist the returned public URL.

use axum::{
    extract::{Extension, Multipart, Path, State},
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use teamloom_shared::FileType;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

use super::teams::UserBrief;

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceView {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub description: String,
    pub user: UserBrief,
    pub team_id: Uuid,
    pub filetype: FileType,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListData {
    pub resources: Vec<ResourceView>,
    pub count: usize,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct ResourceRow {
    id: Uuid,
    url: String,
    filename: String,
    description: String,
    team_id: Uuid,
    filetype: FileType,
    user_id: Uuid,
    username: String,
    email: String,
    full_name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ResourceRow> for ResourceView {
    fn from(row: ResourceRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            filename: row.filename,
            description: row.description,
            user: UserBrief {
                id: row.user_id,
                username: row.username,
                email: row.email,
                full_name: row.full_name,
            },
            team_id: row.team_id,
            filetype: row.filetype,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RESOURCE_SELECT: &str = r#"
    SELECT r.id, r.url, r.filename, r.description, r.team_id, r.filetype,
           u.id AS user_id, u.username, u.email, u.full_name,
           r.created_at, r.updated_at
    FROM resources r
    JOIN users u ON u.id = r.user_id
"#;

/// Parsed multipart upload form
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    description: String,
    team_id: Option<Uuid>,
    filetype: Option<FileType>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Upload a file as a team resource
pub async fn upload_resource(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<Envelope<ResourceView>> {
    let form = parse_upload_form(multipart).await?;

    let team_id = form
        .team_id
        .ok_or_else(|| ApiError::BadRequest("Team ID is required".to_string()))?;
    let filetype = form
        .filetype
        .ok_or_else(|| ApiError::BadRequest("File type is required".to_string()))?;
    let (file_name, bytes) = form
        .file
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let team: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(&state.pool)
        .await?;
    team.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let temp_path = std::env::temp_dir().join(format!("{}-{}", Uuid::new_v4(), file_name));
    tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
        tracing::error!(error = %e, "upload_resource: failed to stage file");
        ApiError::Internal
    })?;

    let uploaded = state.media.upload(&temp_path).await;
    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
        tracing::warn!(error = %e, path = %temp_path.display(), "failed to clean up temp upload");
    }
    let url = uploaded.map_err(|e| {
        tracing::error!(error = %e, "upload_resource: storage upload failed");
        ApiError::Upstream("Error uploading file to storage".to_string())
    })?;

    let resource_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO resources (id, url, filename, description, user_id, team_id, filetype)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(resource_id)
    .bind(&url)
    .bind(&file_name)
    .bind(&form.description)
    .bind(user.id)
    .bind(team_id)
    .bind(filetype)
    .execute(&state.pool)
    .await?;

    let resource = fetch_resource(&state.pool, resource_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::created(resource, "Resource uploaded successfully"))
}

/// List a team's resources, newest first
pub async fn get_resources(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Envelope<ResourceListData>> {
    let rows: Vec<ResourceRow> = sqlx::query_as(&format!(
        "{RESOURCE_SELECT} WHERE r.team_id = $1 ORDER BY r.created_at DESC"
    ))
    .bind(team_id)
    .fetch_all(&state.pool)
    .await?;

    let resources: Vec<ResourceView> = rows.into_iter().map(ResourceView::from).collect();
    let count = resources.len();

    Ok(Envelope::ok(
        ResourceListData { resources, count },
        "Resources fetched successfully",
    ))
}

/// List a team's resources of one file type
pub async fn get_resources_by_type(
    State(state): State<AppState>,
    Path((team_id, filetype)): Path<(Uuid, FileType)>,
) -> ApiResult<Envelope<ResourceListData>> {
    let rows: Vec<ResourceRow> = sqlx::query_as(&format!(
        "{RESOURCE_SELECT} WHERE r.team_id = $1 AND r.filetype = $2 ORDER BY r.created_at DESC"
    ))
    .bind(team_id)
    .bind(filetype)
    .fetch_all(&state.pool)
    .await?;

    let resources: Vec<ResourceView> = rows.into_iter().map(ResourceView::from).collect();
    let count = resources.len();

    Ok(Envelope::ok(
        ResourceListData { resources, count },
        "Resources fetched successfully",
    ))
}

/// Delete a resource and its stored object. Uploader only.
pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(resource_id): Path<Uuid>,
) -> ApiResult<Envelope<serde_json::Value>> {
    let resource: Option<(Uuid, String)> =
        sqlx::query_as("SELECT user_id, url FROM resources WHERE id = $1")
            .bind(resource_id)
            .fetch_optional(&state.pool)
            .await?;
    let (owner_id, url) =
        resource.ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    if owner_id != user.id {
        return Err(ApiError::Forbidden);
    }

    if let Err(e) = state.media.delete(&url).await {
        tracing::warn!(error = %e, url = %url, "failed to delete stored resource object");
    }

    sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(resource_id)
        .execute(&state.pool)
        .await?;

    Ok(Envelope::ok(
        serde_json::json!({}),
        "Resource deleted successfully",
    ))
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_resource(pool: &PgPool, resource_id: Uuid) -> ApiResult<Option<ResourceView>> {
    let row: Option<ResourceRow> =
        sqlx::query_as(&format!("{RESOURCE_SELECT} WHERE r.id = $1"))
            .bind(resource_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(ResourceView::from))
}

async fn parse_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm {
        file: None,
        description: String::new(),
        team_id: None,
        filetype: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            Some("description") => {
                form.description = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            Some("teamId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                form.team_id = Some(
                    text.parse()
                        .map_err(|_| ApiError::BadRequest("Invalid team ID".to_string()))?,
                );
            }
            Some("filetype") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                form.filetype = Some(
                    text.parse()
                        .map_err(|_| ApiError::BadRequest("Invalid file type".to_string()))?,
                );
            }
            _ => {}
        }
    }

    Ok(form)
}
