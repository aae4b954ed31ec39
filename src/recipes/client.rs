//! HTTP client for the recipe endpoint

use super::clean_markdown;
use crate::error::{PantryError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct RecipeRequest<'a> {
    ingredients: &'a [String],
}

/// Recipes field as returned by the endpoint: one text or a list of texts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipesPayload {
    One(String),
    Many(Vec<String>),
}

impl RecipesPayload {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(text) => vec![text],
            Self::Many(texts) => texts,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecipeResponse {
    #[serde(default, alias = "recipe")]
    recipes: Option<RecipesPayload>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Posts ingredient lists to `POST /api/get-recipes`
pub struct RecipeClient {
    client: Client,
    endpoint: String,
}

impl RecipeClient {
    /// Create a client for the endpoint at `endpoint`
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("pantrygenie/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PantryError::Recipe(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request recipe suggestions for `ingredients`
    ///
    /// The returned texts have markdown markers stripped. A single string
    /// from the endpoint becomes a one-element list.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::Validation`] for an empty list without sending
    /// anything, and [`PantryError::Recipe`] carrying the endpoint's error
    /// text for any non-OK response
    pub async fn suggest(&self, ingredients: &[String]) -> Result<Vec<String>> {
        if ingredients.is_empty() {
            return Err(
                PantryError::Validation("There are no ingredients in your pantry.".to_string()).into(),
            );
        }

        tracing::debug!(endpoint = %self.endpoint, count = ingredients.len(), "Requesting recipes");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RecipeRequest { ingredients })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error fetching recipes: {}", e);
                PantryError::Recipe(format!("Error fetching recipes: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PantryError::Recipe(format!("Error reading recipe response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        format!("Recipe request failed with status {}", status)
                    } else {
                        body.trim().to_string()
                    }
                });
            tracing::error!("Recipe endpoint returned {}: {}", status, message);
            return Err(PantryError::Recipe(message).into());
        }

        let parsed: RecipeResponse = serde_json::from_str(&body).map_err(|e| {
            PantryError::Recipe(format!("Invalid response from the recipe endpoint: {}", e))
        })?;

        let recipes: Vec<String> = parsed
            .recipes
            .ok_or_else(|| {
                PantryError::Recipe("Invalid response from the recipe endpoint.".to_string())
            })?
            .into_vec()
            .iter()
            .map(|text| clean_markdown(text))
            .filter(|text| !text.is_empty())
            .collect();

        tracing::debug!(count = recipes.len(), "Received recipes");
        Ok(recipes)
    }
}
