//! Generative-text API client
//!
//! Single-prompt, single-response generation against a Gemini-style REST
//! endpoint. No streaming.

use std::time::Duration;

use serde_json::{json, Value};

use crate::config::Config;

#[derive(Clone)]
pub struct GenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GenAiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.outbound_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.genai_api_url.trim_end_matches('/').to_string(),
            api_key: config.genai_api_key.clone(),
            model: config.genai_model.clone(),
        })
    }

    /// Generate a single text completion for the prompt
    pub async fn generate(&self, prompt: &str) -> Result<String, GenAiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenAiError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        extract_text(&body).ok_or(GenAiError::MalformedResponse)
    }
}

/// Pull the generated text out of `candidates[0].content.parts[0].text`
fn extract_text(body: &Value) -> Option<String> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Generation service responded with status {0}")]
    Status(u16),
    #[error("Generation response had no text candidate")]
    MalformedResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "1. Do the thing" }] }
            }]
        });
        assert_eq!(extract_text(&body).as_deref(), Some("1. Do the thing"));
    }

    #[test]
    fn test_extract_text_missing_candidates() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!({"candidates": []})), None);
    }
}
