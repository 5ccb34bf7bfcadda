//! GitHub repository insight routes

use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    integrations::extract_owner_and_repo,
    response::Envelope,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoQuery {
    pub repo_url: Option<String>,
}

impl RepoQuery {
    fn owner_and_repo(&self) -> ApiResult<(String, String)> {
        let url = self
            .repo_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Repository URL is required".to_string()))?;
        extract_owner_and_repo(url).map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

/// Fetch the commit list for a repository
pub async fn fetch_commits(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
) -> ApiResult<Envelope<Value>> {
    let (owner, repo) = query.owner_and_repo()?;

    let commits = state
        .github
        .commits(&owner, &repo)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Envelope::ok(commits, "Commits fetched successfully"))
}

/// Fetch the open pull requests for a repository
pub async fn fetch_pull_requests(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
) -> ApiResult<Envelope<Value>> {
    let (owner, repo) = query.owner_and_repo()?;

    let pulls = state
        .github
        .pull_requests(&owner, &repo)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Envelope::ok(pulls, "Pull requests fetched successfully"))
}

/// Fetch aggregate repository statistics
pub async fn fetch_repo_stats(
    State(state): State<AppState>,
    Query(query): Query<RepoQuery>,
) -> ApiResult<Envelope<Value>> {
    let (owner, repo) = query.owner_and_repo()?;

    let stats = state
        .github
        .repo_stats(&owner, &repo)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Envelope::ok(
        stats,
        "Repository statistics fetched successfully",
    ))
}
