//! Health check endpoint

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::State;
use serde::Serialize;

use crate::{response::Envelope, state::AppState};

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// Record the process start time; call once from main
pub fn mark_started() {
    let _ = STARTED_AT.set(Instant::now());
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub uptime_secs: u64,
    pub version: String,
    pub database: String,
}

/// Health check: uptime, version, database connectivity
pub async fn healthcheck(State(state): State<AppState>) -> Envelope<HealthData> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    let uptime_secs = STARTED_AT
        .get()
        .map(|started| started.elapsed().as_secs())
        .unwrap_or(0);

    Envelope::ok(
        HealthData {
            uptime_secs,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        },
        "Health check details",
    )
}
