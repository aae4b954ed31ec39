//! Recipe suggestions
//!
//! The server side turns an ingredient list into a single prompt for the
//! configured language model ([`RecipeService`]). The client side posts the
//! pantry contents to the recipe endpoint and tidies the text for display
//! ([`RecipeClient`]).

use crate::error::{PantryError, Result};
use crate::providers::{Message, Provider};
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub mod client;
pub use client::RecipeClient;

/// Build the prompt sent upstream for a list of ingredients
///
/// # Examples
///
/// ```
/// use pantrygenie::recipes::build_prompt;
///
/// let prompt = build_prompt(&["egg".to_string(), "flour".to_string()]);
/// assert_eq!(prompt, "Suggest a recipe using the following ingredients: egg, flour.");
/// ```
pub fn build_prompt(ingredients: &[String]) -> String {
    format!(
        "Suggest a recipe using the following ingredients: {}.",
        ingredients.join(", ")
    )
}

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"(?m)^[ \t]*#+[ \t]*").expect("valid heading regex"))
}

fn emphasis_regex() -> &'static Regex {
    static EMPHASIS: OnceLock<Regex> = OnceLock::new();
    EMPHASIS.get_or_init(|| Regex::new(r"\*+").expect("valid emphasis regex"))
}

/// Strip markdown emphasis markers and leading heading markers
///
/// # Examples
///
/// ```
/// use pantrygenie::recipes::clean_markdown;
///
/// assert_eq!(clean_markdown("**Pasta** with *basil*"), "Pasta with basil");
/// assert_eq!(clean_markdown("## Title"), "Title");
/// ```
pub fn clean_markdown(text: &str) -> String {
    let without_headings = heading_regex().replace_all(text, "");
    emphasis_regex()
        .replace_all(&without_headings, "")
        .trim()
        .to_string()
}

/// Server-side recipe generation
pub struct RecipeService {
    provider: Arc<dyn Provider>,
}

impl RecipeService {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Name of the upstream provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the language model for recipes using `ingredients`
    ///
    /// Returns the generated text as a one-element list.
    ///
    /// # Errors
    ///
    /// Returns the provider error unchanged; there is no retry
    pub async fn suggest(&self, ingredients: &[String]) -> Result<Vec<String>> {
        let prompt = build_prompt(ingredients);
        tracing::info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            "Prompt: {}",
            prompt
        );

        let response = self.provider.complete(&[Message::user(prompt)]).await?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Recipe completion usage"
            );
        }

        let content = response.message.content;
        if content.trim().is_empty() {
            return Err(PantryError::Provider(format!(
                "Invalid response from the {} API.",
                self.provider.name()
            ))
            .into());
        }
        Ok(vec![content])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CompletionResponse;
    use crate::test_utils::StubProvider;

    #[test]
    fn test_build_prompt_single_ingredient() {
        assert_eq!(
            build_prompt(&["rice".to_string()]),
            "Suggest a recipe using the following ingredients: rice."
        );
    }

    #[test]
    fn test_clean_markdown_multiline() {
        let text = "# Omelette\n\n**Ingredients**\n* 2 eggs\n  ### Steps\nWhisk *well*.";
        assert_eq!(
            clean_markdown(text),
            "Omelette\n\nIngredients\n 2 eggs\nSteps\nWhisk well."
        );
    }

    #[test]
    fn test_clean_markdown_keeps_inline_hash() {
        assert_eq!(clean_markdown("Use pan #2"), "Use pan #2");
    }

    #[tokio::test]
    async fn test_service_sends_prompt_and_wraps_content() {
        let provider = Arc::new(StubProvider::replying(CompletionResponse::new(
            Message::assistant("Pancakes"),
        )));
        let service = RecipeService::new(provider.clone());

        let recipes = service
            .suggest(&["egg".to_string(), "flour".to_string()])
            .await
            .unwrap();

        assert_eq!(recipes, vec!["Pancakes".to_string()]);
        assert_eq!(
            provider.prompts(),
            vec!["Suggest a recipe using the following ingredients: egg, flour.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_service_rejects_blank_completion() {
        let provider = Arc::new(StubProvider::replying(CompletionResponse::new(
            Message::assistant("   "),
        )));
        let service = RecipeService::new(provider);

        let err = service.suggest(&["egg".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("Invalid response from the Stub API."));
    }

    #[tokio::test]
    async fn test_service_propagates_provider_error() {
        let provider = Arc::new(StubProvider::failing("quota exceeded"));
        let service = RecipeService::new(provider);

        let err = service.suggest(&["egg".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
