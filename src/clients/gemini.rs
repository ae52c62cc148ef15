use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::clients::TextGenerator;
use crate::error::{AppError, Result};

const X_GOOG_API_KEY: &str = "X-Goog-Api-Key";

/// Gemini-backed generator.
///
/// Generation goes through `gemini_rs`, which picks the key up from `GEMINI_API_KEY` itself.
/// `api_key` and `api_base` only drive [`GeminiClient::check_api_key`].
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    http: reqwest::Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<serde_json::Value>,
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String) -> Self {
        Self { api_key, api_base: api_base.trim_end_matches('/').to_string(), http: reqwest::Client::new() }
    }

    /// Lists the models visible to the configured key. Used once at startup to tell a bad key
    /// apart from a bad request later on.
    pub async fn check_api_key(&self) -> Result<usize> {
        let url = format!("{}/v1beta/models", self.api_base);
        let response = self
            .http
            .get(&url)
            .header(X_GOOG_API_KEY, &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::External(format!("model listing failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!(
                "model listing returned {}: {}",
                status.as_u16(),
                extract_error_message(&body).unwrap_or(body)
            )));
        }

        let listing: ListModelsResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("model listing was not JSON: {e}")))?;
        Ok(listing.models.len())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        tracing::debug!(model, prompt_len = prompt.len(), "calling gemini");
        let resp = gemini_rs::chat(model)
            .send_message(prompt)
            .await
            .map_err(|e| AppError::External(e.to_string()))?;
        Ok(resp.to_string())
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;
    parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn key_check_uses_configured_key_and_base() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1beta/models")
            .match_header("x-goog-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models":[{"name":"models/gemini-1.5-pro"},{"name":"models/gemini-1.5-flash"}]}"#)
            .create_async()
            .await;

        let client = GeminiClient::new("test-key".into(), server.url());
        assert_eq!(client.check_api_key().await.unwrap(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn key_check_surfaces_api_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/models")
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid."}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new("bad".into(), format!("{}/", server.url()));
        let err = client.check_api_key().await.unwrap_err();
        assert!(matches!(err, AppError::External(ref msg) if msg.contains("API key not valid.")));
    }

    #[test]
    fn debug_redacts_key() {
        let client = GeminiClient::new("secret".into(), "https://example.test".into());
        assert!(!format!("{client:?}").contains("secret"));
    }
}
