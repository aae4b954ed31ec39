//! End-to-end tests for the recipe flow
//!
//! Recipe client -> HTTP server -> recipe service -> upstream provider,
//! with the upstream OpenRouter API mocked.

mod common;

use common::{spawn_server, FixedProvider};
use pantrygenie::config::OpenRouterConfig;
use pantrygenie::error::PantryError;
use pantrygenie::providers::OpenRouterProvider;
use pantrygenie::recipes::RecipeClient;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn openrouter_backed_server(upstream: &MockServer, dir: &TempDir) -> String {
    let provider = OpenRouterProvider::new(
        OpenRouterConfig {
            api_base: upstream.uri(),
            model: "test/model".to_string(),
        },
        Some("test-key".to_string()),
        5,
    )
    .unwrap();
    spawn_server(Arc::new(provider), dir.path()).await
}

#[tokio::test]
async fn test_recipes_round_trip_through_openrouter() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test/model",
            "messages": [{
                "role": "user",
                "content": "Suggest a recipe using the following ingredients: egg, flour."
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "## Pancakes\n**Mix** and fry."}
            }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let dir = TempDir::new().unwrap();
    let base = openrouter_backed_server(&upstream, &dir).await;
    let client = RecipeClient::new(format!("{}/api/get-recipes", base), 5).unwrap();

    let recipes = client
        .suggest(&["egg".to_string(), "flour".to_string()])
        .await
        .unwrap();
    assert_eq!(recipes, vec!["Pancakes\nMix and fry.".to_string()]);
}

#[tokio::test]
async fn test_upstream_without_choices_reaches_client_as_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&upstream)
        .await;

    let dir = TempDir::new().unwrap();
    let base = openrouter_backed_server(&upstream, &dir).await;
    let client = RecipeClient::new(format!("{}/api/get-recipes", base), 5).unwrap();

    let err = client.suggest(&["egg".to_string()]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PantryError>(),
        Some(PantryError::Recipe(msg)) if msg == "Invalid response from the OpenRouter API."
    ));
}

#[tokio::test]
async fn test_upstream_error_status_is_surfaced() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "Rate limit exceeded"}
        })))
        .mount(&upstream)
        .await;

    let dir = TempDir::new().unwrap();
    let base = openrouter_backed_server(&upstream, &dir).await;
    let client = RecipeClient::new(format!("{}/api/get-recipes", base), 5).unwrap();

    let err = client.suggest(&["egg".to_string()]).await.unwrap_err();
    assert!(err.to_string().contains("Rate limit exceeded"));
}

#[tokio::test]
async fn test_malformed_request_is_rejected_over_http() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(Arc::new(FixedProvider("unused".to_string())), dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/get-recipes", base))
        .json(&serde_json::json!({"ingredients": "egg"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({"error": "Invalid request: 'ingredients' must be an array."})
    );
}

#[tokio::test]
async fn test_get_is_not_allowed_over_http() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(Arc::new(FixedProvider("unused".to_string())), dir.path()).await;

    let response = reqwest::get(format!("{}/api/get-recipes", base)).await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST");
    assert_eq!(response.text().await.unwrap(), "Method GET Not Allowed");
}

#[tokio::test]
async fn test_client_cleans_fixed_provider_text() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(
        Arc::new(FixedProvider("**Pasta** with *basil*".to_string())),
        dir.path(),
    )
    .await;
    let client = RecipeClient::new(format!("{}/api/get-recipes", base), 5).unwrap();

    let recipes = client.suggest(&["basil".to_string()]).await.unwrap();
    assert_eq!(recipes, vec!["Pasta with basil".to_string()]);
}
