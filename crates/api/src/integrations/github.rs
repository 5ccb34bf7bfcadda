//! GitHub REST API client
//!
//! Read-only calls keyed by owner/repo extracted from a repository URL.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::Config;

/// Client for the GitHub REST API
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.outbound_timeout_secs))
            // GitHub rejects requests without a User-Agent
            .user_agent(concat!("teamloom/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, GithubError> {
        let mut request = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }

    pub async fn commits(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/repos/{owner}/{repo}/commits")).await
    }

    pub async fn pull_requests(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/repos/{owner}/{repo}/pulls")).await
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/repos/{owner}/{repo}")).await
    }

    async fn branches(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/repos/{owner}/{repo}/branches")).await
    }

    async fn contributors(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/repos/{owner}/{repo}/contributors")).await
    }

    async fn issues(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        self.get_json(&format!("/repos/{owner}/{repo}/issues")).await
    }

    /// Gather repository statistics with a fan-out of independent read-only
    /// calls. No ordering between them; the whole operation fails if any one
    /// call fails.
    pub async fn repo_stats(&self, owner: &str, repo: &str) -> Result<Value, GithubError> {
        let (repository, branches, contributors, issues, pull_requests, commits) = tokio::try_join!(
            self.repository(owner, repo),
            self.branches(owner, repo),
            self.contributors(owner, repo),
            self.issues(owner, repo),
            self.pull_requests(owner, repo),
            self.commits(owner, repo),
        )?;

        Ok(json!({
            "repository": repository,
            "branches": branches,
            "contributors": contributors,
            "issues": issues,
            "pullRequests": pull_requests,
            "commits": commits,
        }))
    }
}

/// Parse `owner` and `repo` out of a GitHub repository URL
pub fn extract_owner_and_repo(repo_url: &str) -> Result<(String, String), RepoUrlError> {
    let rest = repo_url
        .trim()
        .strip_prefix("https://")
        .or_else(|| repo_url.trim().strip_prefix("http://"))
        .ok_or_else(|| RepoUrlError(repo_url.to_string()))?;

    let mut segments = rest.split('/');
    let host = segments.next().unwrap_or_default();
    if host != "github.com" && host != "www.github.com" {
        return Err(RepoUrlError(repo_url.to_string()));
    }

    let owner = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RepoUrlError(repo_url.to_string()))?;
    let repo = segments
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches(".git"))
        .ok_or_else(|| RepoUrlError(repo_url.to_string()))?;

    Ok((owner.to_string(), repo.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid GitHub repository URL: {0}")]
pub struct RepoUrlError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub responded with status {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_owner_and_repo() {
        let (owner, repo) = extract_owner_and_repo("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "rust");
    }

    #[test]
    fn test_extract_strips_git_suffix() {
        let (_, repo) = extract_owner_and_repo("https://github.com/tokio-rs/tokio.git").unwrap();
        assert_eq!(repo, "tokio");
    }

    #[test]
    fn test_extract_ignores_trailing_path() {
        let (owner, repo) =
            extract_owner_and_repo("https://github.com/tokio-rs/axum/tree/main/examples").unwrap();
        assert_eq!(owner, "tokio-rs");
        assert_eq!(repo, "axum");
    }

    #[test]
    fn test_extract_rejects_non_github_urls() {
        assert!(extract_owner_and_repo("https://gitlab.com/a/b").is_err());
        assert!(extract_owner_and_repo("github.com/a/b").is_err());
        assert!(extract_owner_and_repo("https://github.com/only-owner").is_err());
        assert!(extract_owner_and_repo("").is_err());
    }
}
