//! Provider module for PantryGenie
//!
//! This module contains the hosted language model abstraction and the
//! OpenRouter and Gemini implementations used for recipe generation.

pub mod base;
pub mod gemini;
pub mod openrouter;

pub use base::{CompletionResponse, Message, Provider, TokenUsage};
pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

use crate::config::ProviderConfig;
use crate::error::{PantryError, Result};

/// Create a provider instance based on configuration
///
/// API keys are read from the environment here (`OPENROUTER_API_KEY`,
/// `GEMINI_API_KEY`) and never stored in configuration.
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "openrouter" => Ok(Box::new(OpenRouterProvider::new(
            config.openrouter.clone(),
            std::env::var(openrouter::OPENROUTER_API_KEY_ENV).ok(),
            config.timeout_seconds,
        )?)),
        "gemini" => Ok(Box::new(GeminiProvider::new(
            config.gemini.clone(),
            std::env::var(gemini::GEMINI_API_KEY_ENV).ok(),
            config.timeout_seconds,
        )?)),
        other => Err(PantryError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
