//! Generative-text routes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    response::Envelope,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub title: String,
    pub description: String,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GenerateData {
    pub text: String,
}

/// Generate an implementation plan for a task from its title and description
pub async fn generate_response(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Envelope<GenerateData>> {
    if req.title.trim().is_empty() || req.description.trim().is_empty() || req.team_id.is_none() {
        return Err(ApiError::BadRequest(
            "Title, description, and team ID are required".to_string(),
        ));
    }

    let prompt = build_prompt(&req.title, &req.description);

    let text = state.gen_ai.generate(&prompt).await.map_err(|e| {
        tracing::error!(error = %e, "generate_response: generation failed");
        ApiError::Upstream(e.to_string())
    })?;

    Ok(Envelope::created(
        GenerateData { text },
        "Response generated successfully",
    ))
}

fn build_prompt(title: &str, description: &str) -> String {
    format!(
        "The title is : {title} and the related description is : {description} , \
         if the data provided is related to achieving or implementing a task , \
         give at most 8 numbered points to achieve or implement it with nothing else , \
         start from the point without any prior description"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_inputs() {
        let prompt = build_prompt("Add caching", "Cache GitHub responses");
        assert!(prompt.contains("Add caching"));
        assert!(prompt.contains("Cache GitHub responses"));
        assert!(prompt.contains("8 numbered points"));
    }

    #[test]
    fn test_generate_request_camel_case() {
        let req: GenerateRequest = serde_json::from_str(&format!(
            r#"{{"title":"t","description":"d","teamId":"{}"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(req.team_id.is_some());
    }
}
