//! Account routes: registration, session lifecycle, profile mutation

use std::path::PathBuf;

use axum::{
    extract::{Extension, Multipart, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::AppendHeaders,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    auth::{
        build_cookie, clear_cookie, get_cookie, hash_password, issue_token_pair,
        load_current_user, refresh_access_token, revoke_refresh_token, verify_password,
        CurrentUser, ACCESS_COOKIE, REFRESH_COOKIE,
    },
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSocialsRequest {
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub facebook: Option<String>,
    pub behance: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: CurrentUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    pub access_token: String,
    pub user: CurrentUser,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct LoginRow {
    id: Uuid,
    password_hash: String,
}

#[derive(Debug, FromRow)]
struct PasswordHashRow {
    password_hash: String,
}

#[derive(Debug, FromRow)]
struct PictureRow {
    url: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Envelope<CurrentUser>> {
    let full_name = req.full_name.trim();
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_lowercase();

    if full_name.is_empty()
        || email.is_empty()
        || username.is_empty()
        || req.password.trim().is_empty()
    {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }

    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    let exists: Option<(bool,)> =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)")
            .bind(&username)
            .bind(&email)
            .fetch_optional(&state.pool)
            .await?;

    if exists.map(|r| r.0).unwrap_or(false) {
        return Err(ApiError::Conflict(
            "User with email or username already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "register: password hashing failed");
        ApiError::Internal
    })?;

    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, full_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&username)
    .bind(&email)
    .bind(full_name)
    .bind(&password_hash)
    .execute(&state.pool)
    .await?;

    tracing::info!(user_id = %user_id, username = %username, "register: account created");

    let user = load_current_user(&state.pool, user_id)
        .await?
        .ok_or(ApiError::Internal)?;

    Ok(Envelope::created(user, "User registered successfully"))
}

/// Login with username or email
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if req.username.is_none() && req.email.is_none() {
        return Err(ApiError::BadRequest(
            "Username or email is required".to_string(),
        ));
    }

    let username = req.username.map(|u| u.trim().to_lowercase());
    let email = req.email.map(|e| e.trim().to_lowercase());

    let user: LoginRow = sqlx::query_as(
        r#"
        SELECT id, password_hash
        FROM users
        WHERE ($1::TEXT IS NOT NULL AND username = $1)
           OR ($2::TEXT IS NOT NULL AND email = $2)
        "#,
    )
    .bind(&username)
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    let valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
        tracing::error!(error = %e, "login: password verification failed");
        ApiError::Internal
    })?;
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    let pair = issue_token_pair(&state.pool, &state.tokens, user.id).await?;
    let current_user = load_current_user(&state.pool, user.id)
        .await?
        .ok_or(ApiError::Internal)?;

    tracing::info!(user_id = %user.id, "login: session established");

    let cookies = AppendHeaders([
        (
            SET_COOKIE,
            build_cookie(
                ACCESS_COOKIE,
                &pair.access_token,
                state.tokens.access_expiry_seconds(),
            ),
        ),
        (
            SET_COOKIE,
            build_cookie(
                REFRESH_COOKIE,
                &pair.refresh_token,
                state.tokens.refresh_expiry_seconds(),
            ),
        ),
    ]);

    Ok((
        cookies,
        Envelope::ok(
            LoginData {
                user: current_user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Logout: revoke the stored refresh token and clear both cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl axum::response::IntoResponse> {
    revoke_refresh_token(&state.pool, user.id).await?;

    let cookies = AppendHeaders([
        (SET_COOKIE, clear_cookie(ACCESS_COOKIE)),
        (SET_COOKIE, clear_cookie(REFRESH_COOKIE)),
    ]);

    Ok((
        cookies,
        Envelope::ok(serde_json::json!({}), "User logged out"),
    ))
}

/// Exchange a refresh token for a new access token
///
/// The token is read from the `refreshToken` cookie or the request body.
/// The refresh token itself is not rotated here; only a full login rotates
/// it.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let incoming = get_cookie(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .ok_or(ApiError::Unauthorized)?;

    let (access_token, user) =
        refresh_access_token(&state.pool, &state.tokens, &incoming).await?;

    let cookies = AppendHeaders([(
        SET_COOKIE,
        build_cookie(
            ACCESS_COOKIE,
            &access_token,
            state.tokens.access_expiry_seconds(),
        ),
    )]);

    Ok((
        cookies,
        Envelope::ok(RefreshData { access_token, user }, "Access token refreshed"),
    ))
}

/// Change the current password, requiring the old one
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Envelope<serde_json::Value>> {
    if req.new_password.trim().is_empty() {
        return Err(ApiError::BadRequest("New password is required".to_string()));
    }

    let row: PasswordHashRow =
        sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = verify_password(&req.old_password, &row.password_hash).map_err(|e| {
        tracing::error!(error = %e, "change_password: verification failed");
        ApiError::Internal
    })?;
    if !valid {
        return Err(ApiError::BadRequest("Invalid old password".to_string()));
    }

    // Every password mutation goes through the same hashing path
    let password_hash = hash_password(&req.new_password).map_err(|e| {
        tracing::error!(error = %e, "change_password: hashing failed");
        ApiError::Internal
    })?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    Ok(Envelope::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

/// Return the authenticated account
pub async fn current_user(
    Extension(user): Extension<CurrentUser>,
) -> Envelope<CurrentUser> {
    Envelope::ok(user, "User fetched successfully")
}

/// Update display name, email, and bio
pub async fn update_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Envelope<CurrentUser>> {
    let full_name = req.full_name.trim();
    let email = req.email.trim().to_lowercase();

    if full_name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    sqlx::query(
        r#"
        UPDATE users
        SET full_name = $1, email = $2, bio = COALESCE($3, bio), updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(full_name)
    .bind(&email)
    .bind(req.bio.as_deref())
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let updated = load_current_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Envelope::ok(updated, "Account details updated successfully"))
}

/// Update social profile links, keeping any field not supplied
pub async fn update_socials(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateSocialsRequest>,
) -> ApiResult<Envelope<CurrentUser>> {
    sqlx::query(
        r#"
        UPDATE users
        SET social_github = COALESCE($1, social_github),
            social_linkedin = COALESCE($2, social_linkedin),
            social_facebook = COALESCE($3, social_facebook),
            social_behance = COALESCE($4, social_behance),
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(req.github.as_deref().map(str::trim))
    .bind(req.linkedin.as_deref().map(str::trim))
    .bind(req.facebook.as_deref().map(str::trim))
    .bind(req.behance.as_deref().map(str::trim))
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let updated = load_current_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Envelope::ok(updated, "Socials updated successfully"))
}

/// Upload a new profile picture, replacing any previous object
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<Envelope<CurrentUser>> {
    replace_picture(&state, user.id, multipart, "profile_picture").await?;

    let updated = load_current_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Envelope::ok(updated, "Profile picture updated successfully"))
}

/// Upload a new cover picture, replacing any previous object
pub async fn upload_cover_picture(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<Envelope<CurrentUser>> {
    replace_picture(&state, user.id, multipart, "cover_picture").await?;

    let updated = load_current_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Envelope::ok(updated, "Cover picture updated successfully"))
}

/// Delete the profile picture and its stored object
pub async fn delete_profile_picture(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Envelope<CurrentUser>> {
    remove_picture(&state, user.id, "profile_picture").await?;

    let updated = load_current_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Envelope::ok(updated, "Profile picture deleted successfully"))
}

/// Delete the cover picture and its stored object
pub async fn delete_cover_picture(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Envelope<CurrentUser>> {
    remove_picture(&state, user.id, "cover_picture").await?;

    let updated = load_current_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Envelope::ok(updated, "Cover picture deleted successfully"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Upload the multipart file and swap it into the given picture column
async fn replace_picture(
    state: &AppState,
    user_id: Uuid,
    multipart: Multipart,
    column: &'static str,
) -> ApiResult<()> {
    let (file_name, bytes) = read_file_field(multipart).await?;
    let temp_path = write_temp_file(&file_name, &bytes).await?;

    let uploaded = state.media.upload(&temp_path).await;
    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
        tracing::warn!(error = %e, path = %temp_path.display(), "failed to clean up temp upload");
    }
    let url = uploaded.map_err(|e| {
        tracing::error!(error = %e, "picture upload failed");
        ApiError::Upstream("Error uploading file to storage".to_string())
    })?;

    let old: Option<PictureRow> = sqlx::query_as(&format!(
        "SELECT {column} AS url FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?;

    if let Some(old) = old.filter(|row| !row.url.is_empty()) {
        if let Err(e) = state.media.delete(&old.url).await {
            tracing::warn!(error = %e, url = %old.url, "failed to delete replaced picture");
        }
    }

    sqlx::query(&format!(
        "UPDATE users SET {column} = $1, updated_at = NOW() WHERE id = $2"
    ))
    .bind(&url)
    .bind(user_id)
    .execute(&state.pool)
    .await?;

    Ok(())
}

/// Delete the stored object behind the given picture column and blank it
async fn remove_picture(state: &AppState, user_id: Uuid, column: &'static str) -> ApiResult<()> {
    let old: Option<PictureRow> = sqlx::query_as(&format!(
        "SELECT {column} AS url FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?;

    let old = old.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if old.url.is_empty() {
        return Ok(());
    }

    if let Err(e) = state.media.delete(&old.url).await {
        tracing::warn!(error = %e, url = %old.url, "failed to delete stored picture");
    }

    sqlx::query(&format!(
        "UPDATE users SET {column} = '', updated_at = NOW() WHERE id = $1"
    ))
    .bind(user_id)
    .execute(&state.pool)
    .await?;

    Ok(())
}

/// Pull the `file` field out of a multipart request
async fn read_file_field(mut multipart: Multipart) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            return Ok((file_name, bytes.to_vec()));
        }
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Stage upload bytes on disk so the storage client sees a local file path
async fn write_temp_file(file_name: &str, bytes: &[u8]) -> ApiResult<PathBuf> {
    let path = std::env::temp_dir().join(format!("{}-{}", Uuid::new_v4(), file_name));
    tokio::fs::write(&path, bytes).await.map_err(|e| {
        tracing::error!(error = %e, "failed to stage upload on disk");
        ApiError::Internal
    })?;
    Ok(path)
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("ada@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("ada@com"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("ada@x.com."));
    }

    #[test]
    fn test_register_request_uses_camel_case() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"fullName":"Ada L","email":"ada@x.com","username":"Ada","password":"secret123"}"#,
        )
        .unwrap();
        assert_eq!(req.full_name, "Ada L");
        assert_eq!(req.username, "Ada");
    }

    #[test]
    fn test_login_request_accepts_either_identifier() {
        let by_username: LoginRequest =
            serde_json::from_str(r#"{"username":"ada","password":"secret123"}"#).unwrap();
        assert!(by_username.username.is_some());
        assert!(by_username.email.is_none());

        let by_email: LoginRequest =
            serde_json::from_str(r#"{"email":"ada@x.com","password":"secret123"}"#).unwrap();
        assert!(by_email.email.is_some());
    }

    #[test]
    fn test_refresh_request_body_optional_token() {
        let req: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(req.refresh_token.is_none());

        let req: RefreshRequest =
            serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token.as_deref(), Some("abc"));
    }
}
