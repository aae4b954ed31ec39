//! Gemini provider implementation for PantryGenie
//!
//! Uses the Google Generative Language `generateContent` endpoint. The API
//! key comes from `GEMINI_API_KEY`.

use crate::config::GeminiConfig;
use crate::error::{PantryError, Result};
use crate::providers::base::upstream_error_message;
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Google Gemini API provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("pantrygenie/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PantryError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("{} is not set; recipe requests will fail", GEMINI_API_KEY_ENV);
        }

        tracing::info!(
            "Initialized Gemini provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Assistant turns use Gemini's `model` role
    fn convert_messages(messages: &[Message]) -> GenerateRequest {
        let contents = messages
            .iter()
            .map(|message| Content {
                role: Some(
                    match message.role.as_str() {
                        "assistant" => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            })
            .collect();

        GenerateRequest { contents }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PantryError::MissingCredentials("gemini".to_string()))?;

        let request = Self::convert_messages(messages);

        tracing::debug!(
            "Sending Gemini request: model={}, {} contents",
            self.config.model,
            request.contents.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error fetching from Gemini API: {}", e);
                PantryError::Provider(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = upstream_error_message(&error_text);
            tracing::error!("Gemini returned error {}: {}", status, message);
            return Err(PantryError::Provider(format!(
                "Gemini returned error {}: {}",
                status.as_u16(),
                message
            ))
            .into());
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            PantryError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        let usage = generated
            .usage_metadata
            .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count));

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            tracing::error!("Invalid response from the Gemini API.");
            return Err(
                PantryError::Provider("Invalid response from the Gemini API.".to_string()).into(),
            );
        }

        let message = Message::assistant(text);
        Ok(match usage {
            Some(usage) => CompletionResponse::with_usage(message, usage),
            None => CompletionResponse::new(message),
        })
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, key: Option<&str>) -> GeminiProvider {
        let config = GeminiConfig {
            api_base: server.uri(),
            model: "gemini-1.5-flash".to_string(),
        };
        GeminiProvider::new(config, key.map(str::to_string), 5).unwrap()
    }

    #[test]
    fn test_gemini_endpoint() {
        let provider = GeminiProvider::new(GeminiConfig::default(), None, 120).unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_convert_messages_maps_roles() {
        let request = GeminiProvider::convert_messages(&[
            Message::user("egg"),
            Message::assistant("Omelette"),
        ]);

        assert_eq!(request.contents.len(), 2);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(request.contents[1].role.as_deref(), Some("model"));
        assert_eq!(request.contents[1].parts[0].text, "Omelette");
    }

    #[tokio::test]
    async fn test_complete_joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "egg"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Scrambled "}, {"text": "eggs."}]}}],
                "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("test-key"));
        let response = provider.complete(&[Message::user("egg")]).await.unwrap();
        assert_eq!(response.message.content, "Scrambled eggs.");
        assert_eq!(response.usage, Some(TokenUsage::new(3, 4)));
    }

    #[tokio::test]
    async fn test_complete_without_candidates_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("test-key"));
        let err = provider.complete(&[Message::user("egg")]).await.unwrap_err();
        assert!(err.to_string().contains("Invalid response from the Gemini API."));
    }

    #[tokio::test]
    async fn test_complete_surfaces_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("bad"));
        let err = provider.complete(&[Message::user("egg")]).await.unwrap_err();
        assert!(err.to_string().contains("API key not valid."));
    }
}
