//! OpenRouter provider implementation for PantryGenie
//!
//! Talks to OpenRouter's OpenAI-compatible chat completion API. The API key
//! comes from `OPENROUTER_API_KEY` and is only ever read on the server side.

use crate::config::OpenRouterConfig;
use crate::error::{PantryError, Result};
use crate::providers::base::upstream_error_message;
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the OpenRouter API key
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// OpenRouter API provider
///
/// # Examples
///
/// ```no_run
/// use pantrygenie::config::OpenRouterConfig;
/// use pantrygenie::providers::{Message, OpenRouterProvider, Provider};
///
/// # async fn example() -> pantrygenie::error::Result<()> {
/// let provider = OpenRouterProvider::new(
///     OpenRouterConfig::default(),
///     std::env::var("OPENROUTER_API_KEY").ok(),
///     120,
/// )?;
/// let completion = provider.complete(&[Message::user("Hello!")]).await?;
/// println!("{}", completion.message.content);
/// # Ok(())
/// # }
/// ```
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider instance
    ///
    /// A missing key is not an error here; requests fail with
    /// `MissingCredentials` until one is configured.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenRouterConfig, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("pantrygenie/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PantryError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("{} is not set; recipe requests will fail", OPENROUTER_API_KEY_ENV);
        }

        tracing::info!(
            "Initialized OpenRouter provider: api_base={}, model={}",
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
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PantryError::MissingCredentials("openrouter".to_string()))?;

        let request = ChatRequest {
            model: &self.config.model,
            messages,
        };

        tracing::debug!(
            "Sending OpenRouter request: model={}, {} messages",
            self.config.model,
            messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header("X-Title", "PantryGenie")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error fetching from OpenRouter API: {}", e);
                PantryError::Provider(format!("OpenRouter request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = upstream_error_message(&error_text);
            tracing::error!("OpenRouter returned error {}: {}", status, message);
            return Err(PantryError::Provider(format!(
                "OpenRouter returned error {}: {}",
                status.as_u16(),
                message
            ))
            .into());
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse OpenRouter response: {}", e);
            PantryError::Provider(format!("Failed to parse OpenRouter response: {}", e))
        })?;

        let usage = chat
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

        let Some((role, text)) = chat.choices.into_iter().next().and_then(|choice| {
            let ChatMessage { role, content } = choice.message;
            content.map(|text| (role, text))
        }) else {
            tracing::error!("Invalid response from the OpenRouter API.");
            return Err(
                PantryError::Provider("Invalid response from the OpenRouter API.".to_string()).into(),
            );
        };

        let message = Message {
            role: role.unwrap_or_else(|| "assistant".to_string()),
            content: text,
        };

        tracing::debug!(
            "OpenRouter response: {} chars, usage={:?}",
            message.content.len(),
            usage
        );

        Ok(match usage {
            Some(usage) => CompletionResponse::with_usage(message, usage),
            None => CompletionResponse::new(message),
        })
    }

    fn name(&self) -> &str {
        "OpenRouter"
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

    fn provider_for(server: &MockServer, key: Option<&str>) -> OpenRouterProvider {
        let config = OpenRouterConfig {
            api_base: format!("{}/api/v1", server.uri()),
            model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
        };
        OpenRouterProvider::new(config, key.map(str::to_string), 5).unwrap()
    }

    #[test]
    fn test_openrouter_provider_creation() {
        let provider = OpenRouterProvider::new(OpenRouterConfig::default(), None, 120).unwrap();
        assert_eq!(provider.name(), "OpenRouter");
        assert_eq!(provider.model(), "meta-llama/llama-3.1-8b-instruct:free");
        assert_eq!(
            provider.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "meta-llama/llama-3.1-8b-instruct:free",
                "messages": [{"role": "user", "content": "egg"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Make an omelette."}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("test-key"));
        let response = provider.complete(&[Message::user("egg")]).await.unwrap();

        assert_eq!(response.message, Message::assistant("Make an omelette."));
        assert_eq!(response.usage, Some(TokenUsage::new(12, 4)));
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("test-key"));
        let err = provider.complete(&[Message::user("egg")]).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::Provider(msg)) if msg == "Invalid response from the OpenRouter API."
        ));
    }

    #[tokio::test]
    async fn test_complete_surfaces_upstream_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "No auth credentials found", "code": 401}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, Some("bad-key"));
        let err = provider.complete(&[Message::user("egg")]).await.unwrap_err();
        assert!(err.to_string().contains("No auth credentials found"));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_complete_without_key_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = provider_for(&server, None);
        let err = provider.complete(&[Message::user("egg")]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::MissingCredentials(_))
        ));
    }
}
