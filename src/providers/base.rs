//! Base provider trait and common types for PantryGenie
//!
//! This module defines the Provider trait that every hosted language model
//! backend implements, along with the message and response types shared by
//! all of them.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use pantrygenie::providers::Message;
    ///
    /// let msg = Message::user("Suggest a recipe");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use pantrygenie::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// The generated assistant message
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// Hosted language model backend
///
/// Single-turn text in, text out. Implementations log upstream failures and
/// return them as `PantryError::Provider` carrying the upstream message.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given messages
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing, the API call fails or the
    /// response carries no generated text
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Human-readable provider name, as used in error messages
    fn name(&self) -> &str;

    /// Model requests are sent to
    fn model(&self) -> &str;
}

/// Pull the human-readable message out of an upstream error body
///
/// Both supported APIs return `{"error": {"message": ...}}`; anything else
/// is passed through as text.
pub(crate) fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            let error = value.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::assistant("hi").role, "assistant");
        assert_eq!(Message::user("egg").role, "user");
        assert_eq!(Message::user("egg").content, "egg");
    }

    #[test]
    fn test_completion_response_with_usage() {
        let response = CompletionResponse::with_usage(Message::assistant("Omelette"), TokenUsage::new(10, 5));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_upstream_error_message_from_json() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        assert_eq!(upstream_error_message(body), "Rate limit exceeded");
    }

    #[test]
    fn test_upstream_error_message_string_error() {
        assert_eq!(upstream_error_message(r#"{"error":"No auth"}"#), "No auth");
    }

    #[test]
    fn test_upstream_error_message_plain_text() {
        assert_eq!(upstream_error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
