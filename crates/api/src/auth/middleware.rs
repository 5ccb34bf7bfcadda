//! Session middleware gating every protected route
//!
//! Extracts a candidate access token from the `accessToken` cookie or the
//! `Authorization: Bearer` header (cookie wins), verifies it, resolves the
//! embedded user id to an account record with the secret fields projected
//! out, and attaches the result to the request for downstream handlers.
//! Fails closed with 401 otherwise.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use teamloom_shared::SocialLinks;

use crate::{
    auth::cookies::{get_cookie, ACCESS_COOKIE},
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Authenticated account attached to the request, without secret fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub cover_picture: String,
    pub socials: SocialLinks,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct CurrentUserRow {
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
    bio: String,
    profile_picture: String,
    cover_picture: String,
    social_github: String,
    social_linkedin: String,
    social_facebook: String,
    social_behance: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CurrentUserRow> for CurrentUser {
    fn from(row: CurrentUserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            bio: row.bio,
            profile_picture: row.profile_picture,
            cover_picture: row.cover_picture,
            socials: SocialLinks {
                github: row.social_github,
                linkedin: row.social_linkedin,
                facebook: row.social_facebook,
                behance: row.social_behance,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Load an account by id with password hash and refresh token excluded
pub async fn load_current_user(pool: &PgPool, user_id: Uuid) -> ApiResult<Option<CurrentUser>> {
    let row: Option<CurrentUserRow> = sqlx::query_as(
        r#"
        SELECT id, username, email, full_name, bio, profile_picture, cover_picture,
               social_github, social_linkedin, social_facebook, social_behance,
               created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CurrentUser::from))
}

/// Extract the candidate access token: cookie first, then bearer header
fn extract_access_token(request: &Request) -> Option<String> {
    if let Some(token) = get_cookie(request.headers(), ACCESS_COOKIE) {
        return Some(token);
    }

    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Authentication middleware for protected routes
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_access_token(&request).ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens.verify_access_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "require_auth: access token rejected");
        ApiError::Unauthorized
    })?;

    // The token may outlive the account it was minted for
    let user = load_current_user(&state.pool, claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::COOKIE;

    fn request_with_headers(headers: &[(axum::http::HeaderName, &str)]) -> Request {
        let mut builder = Request::builder().uri("/api/v1/teams");
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_prefers_cookie_over_header() {
        let request = request_with_headers(&[
            (COOKIE, "accessToken=cookie-token"),
            (AUTHORIZATION, "Bearer header-token"),
        ]);
        assert_eq!(extract_access_token(&request).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_extract_falls_back_to_bearer() {
        let request = request_with_headers(&[(AUTHORIZATION, "Bearer header-token")]);
        assert_eq!(extract_access_token(&request).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_extract_rejects_non_bearer_scheme() {
        let request = request_with_headers(&[(AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_access_token(&request), None);
    }

    #[test]
    fn test_extract_none_when_unauthenticated() {
        let request = request_with_headers(&[]);
        assert_eq!(extract_access_token(&request), None);
    }

    #[test]
    fn test_current_user_serializes_without_secrets() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@x.com".to_string(),
            full_name: "Ada L".to_string(),
            bio: String::new(),
            profile_picture: String::new(),
            cover_picture: String::new(),
            socials: SocialLinks::default(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["fullName"], "Ada L");
        assert!(value.get("password").is_none());
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("refreshToken").is_none());
    }
}
