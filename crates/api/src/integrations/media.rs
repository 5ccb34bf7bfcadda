//! Object storage client for media uploads
//!
//! Uploads a local file and returns its public URL; deletes by the object id
//! derived from the URL's final path segment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;

#[derive(Clone)]
pub struct MediaStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl MediaStore {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.outbound_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.media_base_url.trim_end_matches('/').to_string(),
            api_key: config.media_api_key.clone(),
        })
    }

    /// Upload a local file, returning its public URL
    pub async fn upload(&self, local_path: &Path) -> Result<String, MediaError> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| MediaError::Read(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status(status.as_u16()));
        }

        let body: UploadResponse = response.json().await?;
        Ok(body.url)
    }

    /// Delete a stored object by its public URL
    pub async fn delete(&self, file_url: &str) -> Result<(), MediaError> {
        let object_id =
            object_id(file_url).ok_or_else(|| MediaError::InvalidUrl(file_url.to_string()))?;

        let response = self
            .http
            .delete(format!("{}/{}", self.base_url, object_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status(status.as_u16()));
        }

        Ok(())
    }
}

/// Derive the object id from a public URL: the final path segment without
/// its extension
pub fn object_id(file_url: &str) -> Option<String> {
    let without_query = file_url.split('?').next()?;
    let rest = without_query
        .strip_prefix("https://")
        .or_else(|| without_query.strip_prefix("http://"))
        .unwrap_or(without_query);

    let mut segments = rest.trim_end_matches('/').split('/');
    let _host = segments.next()?;
    let last = segments.last().filter(|s| !s.is_empty())?;

    let stem = last.split('.').next().unwrap_or(last);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to read local file: {0}")]
    Read(String),
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage responded with status {0}")]
    Status(u16),
    #[error("Cannot derive object id from URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_from_url() {
        assert_eq!(
            object_id("http://cdn.example.com/media/abc123.png").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            object_id("http://cdn.example.com/media/abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_object_id_ignores_query() {
        assert_eq!(
            object_id("http://cdn.example.com/media/abc123.png?sig=xyz").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_object_id_rejects_bare_host() {
        assert_eq!(object_id("http://cdn.example.com"), None);
        assert_eq!(object_id("https://cdn.example.com/"), None);
    }
}
