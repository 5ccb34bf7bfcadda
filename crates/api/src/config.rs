//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub cors_origin: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry_hours: i64,
    pub refresh_token_expiry_days: i64,

    // Object storage (media uploads)
    pub media_base_url: String,
    pub media_api_key: String,

    // GitHub API
    pub github_api_url: String,
    pub github_token: Option<String>,

    // Generative-text API
    pub genai_api_url: String,
    pub genai_api_key: String,
    pub genai_model: String,

    // Outbound HTTP
    pub outbound_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Authentication
            access_token_secret: require_secret("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: require_secret("REFRESH_TOKEN_SECRET")?,
            access_token_expiry_hours: env::var("ACCESS_TOKEN_EXPIRY_HOURS")
                .unwrap_or_else(|_| "48".to_string())
                .parse()
                .unwrap_or(48),
            refresh_token_expiry_days: env::var("REFRESH_TOKEN_EXPIRY_DAYS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Object storage
            media_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9000/media".to_string()),
            media_api_key: env::var("MEDIA_API_KEY").unwrap_or_default(),

            // GitHub
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            github_token: env::var("GITHUB_TOKEN").ok(),

            // Generative-text
            genai_api_url: env::var("GENAI_API_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            genai_api_key: env::var("GENAI_API_KEY").unwrap_or_default(),
            genai_model: env::var("GENAI_MODEL").unwrap_or_else(|_| "gemini-pro".to_string()),

            // Outbound HTTP
            outbound_timeout_secs: env::var("OUTBOUND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }
}

/// Read a required secret and reject values too short to sign tokens with
fn require_secret(name: &'static str) -> Result<String, ConfigError> {
    let secret = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    if secret.len() < 32 {
        return Err(ConfigError::WeakSecret(name));
    }
    Ok(secret)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0} must be at least 32 characters")]
    WeakSecret(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn setup_minimal_config() {
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var(
            "ACCESS_TOKEN_SECRET",
            "test-access-secret-at-least-32-characters!",
        );
        env::set_var(
            "REFRESH_TOKEN_SECRET",
            "test-refresh-secret-at-least-32-characters",
        );
    }

    fn cleanup_config() {
        env::remove_var("DATABASE_URL");
        env::remove_var("ACCESS_TOKEN_SECRET");
        env::remove_var("REFRESH_TOKEN_SECRET");
    }

    #[test]
    fn test_token_secret_validation() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();

        // Missing access secret
        setup_minimal_config();
        env::remove_var("ACCESS_TOKEN_SECRET");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"))
        ));

        // Short refresh secret rejected
        setup_minimal_config();
        env::set_var("REFRESH_TOKEN_SECRET", "short");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::WeakSecret("REFRESH_TOKEN_SECRET"))
        ));

        // Valid secrets accepted with defaults applied
        setup_minimal_config();
        let config = Config::from_env().expect("valid config");
        assert_eq!(config.access_token_expiry_hours, 48);
        assert_eq!(config.refresh_token_expiry_days, 10);
        assert_eq!(config.genai_model, "gemini-pro");

        cleanup_config();
    }
}
