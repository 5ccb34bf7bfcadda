//! JWT token generation and validation
//!
//! Two token classes signed with distinct secrets: short-lived access tokens
//! carrying the user identity, and longer-lived refresh tokens carrying only
//! the user id. Expiry is enforced by the signed `exp` claim.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Claims embedded in a refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Token service for minting and verifying both token classes
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_expiry_hours: i64,
    refresh_expiry_days: i64,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_expiry_hours: i64,
        refresh_expiry_days: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_expiry_hours,
            refresh_expiry_days,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.access_token_secret,
            &config.refresh_token_secret,
            config.access_token_expiry_hours,
            config.refresh_token_expiry_days,
        )
    }

    /// Mint an access token embedding the user identity
    pub fn mint_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        username: &str,
        full_name: &str,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::hours(self.access_expiry_hours);

        let claims = AccessClaims {
            sub: user_id,
            email: email.to_string(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Mint a refresh token embedding only the user id
    pub fn mint_refresh_token(&self, user_id: Uuid) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::days(self.refresh_expiry_days);

        let claims = RefreshClaims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate and decode an access token
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode::<AccessClaims>(token, &self.access_decoding, &validation())
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    /// Validate and decode a refresh token
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    /// Access token lifetime in seconds (cookie max-age)
    pub fn access_expiry_seconds(&self) -> i64 {
        self.access_expiry_hours * 3600
    }

    /// Refresh token lifetime in seconds (cookie max-age)
    pub fn refresh_expiry_seconds(&self) -> i64 {
        self.refresh_expiry_days * 86_400
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 60; // 60 second clock skew tolerance
    validation
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::Invalid,
        jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
        _ => JwtError::Validation(e.to_string()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "access-secret-key-at-least-32-chars!",
            "refresh-secret-key-at-least-32-chars",
            48,
            10,
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens
            .mint_access_token(user_id, "ada@x.com", "ada", "Ada L")
            .expect("Failed to mint access token");
        let claims = tokens
            .verify_access_token(&token)
            .expect("Invalid access token");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@x.com");
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.full_name, "Ada L");
        assert_eq!(claims.exp - claims.iat, 48 * 3600);
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens
            .mint_refresh_token(user_id)
            .expect("Failed to mint refresh token");
        let claims = tokens
            .verify_refresh_token(&token)
            .expect("Invalid refresh token");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 10 * 86_400);
    }

    #[test]
    fn test_token_classes_use_distinct_secrets() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let access = tokens
            .mint_access_token(user_id, "ada@x.com", "ada", "Ada L")
            .unwrap();
        let refresh = tokens.mint_refresh_token(user_id).unwrap();

        // A token from one class never verifies against the other's secret
        assert!(matches!(
            tokens.verify_refresh_token(&access),
            Err(JwtError::Invalid)
        ));
        assert!(matches!(
            tokens.verify_access_token(&refresh),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let tokens = service();
        let other = TokenService::new(
            "another-access-secret-32-chars-long!",
            "another-refresh-secret-32-chars-long",
            48,
            10,
        );

        let token = tokens
            .mint_access_token(Uuid::new_v4(), "a@b.c", "a", "A")
            .unwrap();
        assert!(matches!(
            other.verify_access_token(&token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let tokens = service();
        assert!(tokens.verify_access_token("not-a-token").is_err());
        assert!(tokens.verify_refresh_token("").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            sub: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            username: "a".to_string(),
            full_name: "A".to_string(),
            iat: now - 7200,
            exp: now - 3600, // past the 60s leeway
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"access-secret-key-at-least-32-chars!"),
        )
        .unwrap();

        assert!(matches!(
            tokens.verify_access_token(&token),
            Err(JwtError::Expired)
        ));
    }
}
