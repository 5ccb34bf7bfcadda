//! Contact message routes

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactStatusRequest {
    pub admin_message: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    pub admin_message: Option<String>,
    pub resolved: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// Handlers
// =============================================================================

/// Send a contact message
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateContactRequest>,
) -> ApiResult<Envelope<ContactView>> {
    if req.subject.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Subject and message are required".to_string(),
        ));
    }

    let contact_id = Uuid::new_v4();
    sqlx::query("INSERT INTO contacts (id, user_id, subject, message) VALUES ($1, $2, $3, $4)")
        .bind(contact_id)
        .bind(user.id)
        .bind(req.subject.trim())
        .bind(req.message.trim())
        .execute(&state.pool)
        .await?;

    let contact: ContactView = sqlx::query_as(
        r#"
        SELECT id, user_id, subject, message, admin_message, resolved, created_at, updated_at
        FROM contacts WHERE id = $1
        "#,
    )
    .bind(contact_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Envelope::created(contact, "Contact message sent successfully"))
}

/// Resolve a contact message, optionally attaching an admin reply
pub async fn update_contact_status(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<UpdateContactStatusRequest>,
) -> ApiResult<Envelope<ContactView>> {
    let contact: Option<ContactView> = sqlx::query_as(
        r#"
        UPDATE contacts
        SET resolved = TRUE, admin_message = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, user_id, subject, message, admin_message, resolved, created_at, updated_at
        "#,
    )
    .bind(req.admin_message.as_deref())
    .bind(contact_id)
    .fetch_optional(&state.pool)
    .await?;

    let contact =
        contact.ok_or_else(|| ApiError::NotFound("Contact message not found".to_string()))?;
    Ok(Envelope::ok(contact, "Contact status updated successfully"))
}

/// List the caller's contact messages, newest first
pub async fn get_contacts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Envelope<Vec<ContactView>>> {
    let contacts: Vec<ContactView> = sqlx::query_as(
        r#"
        SELECT id, user_id, subject, message, admin_message, resolved, created_at, updated_at
        FROM contacts
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Envelope::ok(contacts, "success"))
}

/// List every contact message
pub async fn get_all_contacts(
    State(state): State<AppState>,
) -> ApiResult<Envelope<Vec<ContactView>>> {
    let contacts: Vec<ContactView> = sqlx::query_as(
        r#"
        SELECT id, user_id, subject, message, admin_message, resolved, created_at, updated_at
        FROM contacts
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Envelope::ok(contacts, "success"))
}
