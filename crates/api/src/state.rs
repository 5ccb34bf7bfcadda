//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::TokenService,
    config::Config,
    integrations::{GenAiClient, GithubClient, MediaStore},
};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub github: GithubClient,
    pub gen_ai: GenAiClient,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self, reqwest::Error> {
        let tokens = TokenService::from_config(&config);
        let github = GithubClient::new(&config)?;
        let gen_ai = GenAiClient::new(&config)?;
        let media = MediaStore::new(&config)?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            tokens,
            github,
            gen_ai,
            media,
        })
    }
}
