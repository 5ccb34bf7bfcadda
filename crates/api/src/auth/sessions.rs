//! Refresh-token persistence and rotation
//!
//! At most one refresh token is valid per account: issuing a pair overwrites
//! the stored value (the rotation point), and an exchange is honored only
//! when the presented token is byte-identical to the stored one. Exchanging
//! does not rotate; only a full login does.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    auth::jwt::TokenService,
    auth::middleware::CurrentUser,
    error::{ApiError, ApiResult},
};

/// Freshly minted access/refresh token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, FromRow)]
struct TokenIdentityRow {
    id: Uuid,
    email: String,
    username: String,
    full_name: String,
}

/// Mint a token pair for the account and persist the new refresh token,
/// overwriting any prior value. Exactly one account write.
pub async fn issue_token_pair(
    pool: &PgPool,
    tokens: &TokenService,
    user_id: Uuid,
) -> ApiResult<TokenPair> {
    let user: TokenIdentityRow = sqlx::query_as(
        "SELECT id, email, username, full_name FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let access_token = tokens
        .mint_access_token(user.id, &user.email, &user.username, &user.full_name)
        .map_err(|e| {
            tracing::error!(error = %e, "issue_token_pair: access token minting failed");
            ApiError::Internal
        })?;
    let refresh_token = tokens.mint_refresh_token(user.id).map_err(|e| {
        tracing::error!(error = %e, "issue_token_pair: refresh token minting failed");
        ApiError::Internal
    })?;

    sqlx::query("UPDATE users SET refresh_token = $1, updated_at = NOW() WHERE id = $2")
        .bind(&refresh_token)
        .bind(user.id)
        .execute(pool)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[derive(Debug, FromRow)]
struct RefreshLookupRow {
    id: Uuid,
    email: String,
    username: String,
    full_name: String,
    refresh_token: Option<String>,
}

/// Exchange a refresh token for a new access token
///
/// The stored value must match the incoming token exactly; a mismatch means
/// the token was rotated (or cleared) after this copy was issued. Concurrent
/// exchanges with the same token race and only one observes a match.
pub async fn refresh_access_token(
    pool: &PgPool,
    tokens: &TokenService,
    incoming: &str,
) -> ApiResult<(String, CurrentUser)> {
    let claims = tokens.verify_refresh_token(incoming).map_err(|e| {
        tracing::debug!(error = %e, "refresh: token verification failed");
        ApiError::InvalidToken
    })?;

    let user: RefreshLookupRow = sqlx::query_as(
        "SELECT id, email, username, full_name, refresh_token FROM users WHERE id = $1",
    )
    .bind(claims.sub)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::InvalidToken)?;

    if user.refresh_token.as_deref() != Some(incoming) {
        return Err(ApiError::TokenExpiredOrReused);
    }

    let access_token = tokens
        .mint_access_token(user.id, &user.email, &user.username, &user.full_name)
        .map_err(|e| {
            tracing::error!(error = %e, "refresh: access token minting failed");
            ApiError::Internal
        })?;

    let current_user = crate::auth::middleware::load_current_user(pool, user.id)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    Ok((access_token, current_user))
}

/// Clear the stored refresh token, invalidating every outstanding copy
pub async fn revoke_refresh_token(pool: &PgPool, user_id: Uuid) -> ApiResult<()> {
    sqlx::query("UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
