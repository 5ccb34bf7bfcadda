//! Integration tests for the session lifecycle
//!
//! These tests exercise the token service, refresh rotation, and the
//! middleware's account resolution against a real database.
//!
//! ## Running Tests
//! ```bash
//! export DATABASE_URL="postgres://localhost/teamloom_test"
//! cargo test --test session_lifecycle -- --ignored --test-threads=1
//! ```

use axum::extract::State;
use axum::Json;
use sqlx::PgPool;
use uuid::Uuid;

use teamloom_api::auth::{
    hash_password, issue_token_pair, load_current_user, refresh_access_token,
    revoke_refresh_token, verify_password, TokenService,
};
use teamloom_api::routes::users::{register, RegisterRequest};
use teamloom_api::{ApiError, AppState, Config};

// ============================================================================
// Test Utilities
// ============================================================================

async fn setup_pool() -> PgPool {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let pool = teamloom_shared::create_pool(&database_url, 5)
        .await
        .expect("Failed to connect to test database");
    teamloom_shared::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn token_service() -> TokenService {
    TokenService::new(
        "integration-access-secret-32-chars!!",
        "integration-refresh-secret-32-chars!",
        48,
        10,
    )
}

fn test_state(pool: PgPool) -> AppState {
    let config = Config {
        bind_address: "127.0.0.1:0".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        database_url: String::new(),
        database_max_connections: 5,
        access_token_secret: "integration-access-secret-32-chars!!".to_string(),
        refresh_token_secret: "integration-refresh-secret-32-chars!".to_string(),
        access_token_expiry_hours: 48,
        refresh_token_expiry_days: 10,
        media_base_url: "http://localhost:9000/media".to_string(),
        media_api_key: String::new(),
        github_api_url: "https://api.github.com".to_string(),
        github_token: None,
        genai_api_url: "https://generativelanguage.googleapis.com".to_string(),
        genai_api_key: String::new(),
        genai_model: "gemini-pro".to_string(),
        outbound_timeout_secs: 10,
    };
    AppState::new(pool, config).expect("failed to build state")
}

/// Insert an account directly, hashing the password the way registration does
async fn create_account(pool: &PgPool, username: &str, password: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    let password_hash = hash_password(password).expect("hashing failed");

    sqlx::query(
        "INSERT INTO users (id, username, email, full_name, password_hash) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(username)
    .bind(format!("{username}@example.com"))
    .bind("Test User")
    .bind(&password_hash)
    .execute(pool)
    .await
    .expect("insert failed");

    user_id
}

async fn delete_account(pool: &PgPool, user_id: Uuid) {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("cleanup failed");
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires database
async fn stored_password_is_hashed_and_verifiable() {
    let pool = setup_pool().await;
    let user_id = create_account(&pool, &format!("hash-{}", Uuid::new_v4()), "secret123").await;

    let (stored_hash,): (String,) =
        sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .expect("fetch failed");

    assert_ne!(stored_hash, "secret123");
    assert!(verify_password("secret123", &stored_hash).expect("verify failed"));
    assert!(!verify_password("wrong", &stored_hash).expect("verify failed"));

    delete_account(&pool, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn refresh_token_is_single_valued_and_rotation_invalidates_it() {
    let pool = setup_pool().await;
    let tokens = token_service();
    let user_id = create_account(&pool, &format!("rot-{}", Uuid::new_v4()), "secret123").await;

    // A freshly issued pair refreshes successfully
    let first = issue_token_pair(&pool, &tokens, user_id)
        .await
        .expect("issue failed");
    let (new_access, user) = refresh_access_token(&pool, &tokens, &first.refresh_token)
        .await
        .expect("refresh failed");
    assert!(!new_access.is_empty());
    assert_eq!(user.id, user_id);

    // The refresh path does not rotate: the same token still works
    refresh_access_token(&pool, &tokens, &first.refresh_token)
        .await
        .expect("unrotated token should refresh again");

    // A subsequent login rotates, invalidating the prior value
    let second = issue_token_pair(&pool, &tokens, user_id)
        .await
        .expect("issue failed");
    let replay = refresh_access_token(&pool, &tokens, &first.refresh_token).await;
    assert!(matches!(replay, Err(ApiError::TokenExpiredOrReused)));

    // The new value works
    refresh_access_token(&pool, &tokens, &second.refresh_token)
        .await
        .expect("rotated token should refresh");

    delete_account(&pool, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn revoke_clears_the_stored_refresh_token() {
    let pool = setup_pool().await;
    let tokens = token_service();
    let user_id = create_account(&pool, &format!("rev-{}", Uuid::new_v4()), "secret123").await;

    let pair = issue_token_pair(&pool, &tokens, user_id)
        .await
        .expect("issue failed");
    revoke_refresh_token(&pool, user_id)
        .await
        .expect("revoke failed");

    let result = refresh_access_token(&pool, &tokens, &pair.refresh_token).await;
    assert!(matches!(result, Err(ApiError::TokenExpiredOrReused)));

    delete_account(&pool, user_id).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn deleted_account_resolves_to_nothing() {
    let pool = setup_pool().await;
    let tokens = token_service();
    let user_id = create_account(&pool, &format!("del-{}", Uuid::new_v4()), "secret123").await;

    let access = tokens
        .mint_access_token(user_id, "gone@example.com", "gone", "Gone")
        .expect("mint failed");
    delete_account(&pool, user_id).await;

    // The token still verifies cryptographically...
    let claims = tokens.verify_access_token(&access).expect("verify failed");
    // ...but the middleware's account lookup comes back empty, so the
    // request is rejected with 401
    let resolved = load_current_user(&pool, claims.sub).await.expect("query failed");
    assert!(resolved.is_none());
}

#[tokio::test]
#[ignore] // Requires database
async fn registration_rejects_case_variant_duplicates() {
    let pool = setup_pool().await;
    let state = test_state(pool.clone());
    let suffix = Uuid::new_v4().simple().to_string();

    let envelope = register(
        State(state.clone()),
        Json(RegisterRequest {
            full_name: "Ada L".to_string(),
            email: format!("ada-{suffix}@example.com"),
            username: format!("Ada-{suffix}"),
            password: "secret123".to_string(),
        }),
    )
    .await
    .expect("first registration should succeed");

    // Sanitized account: no password or refresh token in the response body
    let body = serde_json::to_value(&envelope).expect("serialize failed");
    assert_eq!(body["statusCode"], 201);
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());

    // Same username, different case: rejected as a duplicate
    let duplicate = register(
        State(state),
        Json(RegisterRequest {
            full_name: "Ada L".to_string(),
            email: format!("other-{suffix}@example.com"),
            username: format!("aDa-{suffix}"),
            password: "secret123".to_string(),
        }),
    )
    .await;
    assert!(matches!(duplicate, Err(ApiError::Conflict(_))));

    sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(format!("ada-{suffix}"))
        .execute(&pool)
        .await
        .expect("cleanup failed");
}

#[tokio::test]
#[ignore] // Requires database
async fn refresh_with_token_of_deleted_account_is_invalid() {
    let pool = setup_pool().await;
    let tokens = token_service();
    let user_id = create_account(&pool, &format!("ghost-{}", Uuid::new_v4()), "secret123").await;

    let pair = issue_token_pair(&pool, &tokens, user_id)
        .await
        .expect("issue failed");
    delete_account(&pool, user_id).await;

    let result = refresh_access_token(&pool, &tokens, &pair.refresh_token).await;
    assert!(matches!(result, Err(ApiError::InvalidToken)));
}
