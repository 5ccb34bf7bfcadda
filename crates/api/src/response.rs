//! Uniform success envelope
//!
//! Every successful response carries `{statusCode, data, message, success}`,
//! with the HTTP status always equal to the envelope's `statusCode`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success response envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: true,
        }
    }

    /// 200 OK envelope
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    /// 201 Created envelope
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = Envelope::ok(serde_json::json!({"id": 1}), "fetched");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "fetched");
        assert_eq!(value["data"]["id"], 1);
    }

    #[tokio::test]
    async fn test_envelope_status_matches_body() {
        let response = Envelope::created((), "User registered successfully").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], 201);
    }
}
