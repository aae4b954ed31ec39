//! Request handlers for the recipe server

use super::AppState;
use crate::error::PantryError;
use crate::storage::blob::{image_key, IMAGE_PREFIX};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// Error body for a malformed recipe request
pub const INVALID_INGREDIENTS: &str = "Invalid request: 'ingredients' must be an array.";

/// Extract the ingredient list from a request body
///
/// Anything other than a JSON object with an `ingredients` array of
/// strings is rejected.
pub fn parse_ingredients(body: &[u8]) -> Result<Vec<String>, &'static str> {
    let value: Value = serde_json::from_slice(body).map_err(|_| INVALID_INGREDIENTS)?;
    let items = value
        .get("ingredients")
        .and_then(Value::as_array)
        .ok_or(INVALID_INGREDIENTS)?;

    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or(INVALID_INGREDIENTS))
        .collect()
}

/// Message returned to clients for an upstream failure
///
/// Provider errors carry the upstream text without the category prefix.
fn upstream_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<PantryError>() {
        Some(PantryError::Provider(message)) => message.clone(),
        _ => error.to_string(),
    }
}

/// POST /api/get-recipes
///
/// The body is parsed by hand so every malformed request gets the same
/// 400 response instead of axum's extractor rejections.
pub async fn get_recipes(State(state): State<AppState>, body: Bytes) -> Response {
    let ingredients = match parse_ingredients(&body) {
        Ok(ingredients) => ingredients,
        Err(message) => {
            tracing::error!("{}", message);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
        }
    };

    match state.recipes.suggest(&ingredients).await {
        Ok(recipes) => {
            tracing::info!(count = recipes.len(), "Returned recipes");
            (StatusCode::OK, Json(json!({ "recipes": recipes }))).into_response()
        }
        Err(e) => {
            let message = upstream_message(&e);
            tracing::error!(
                "Error fetching from {} API: {}",
                state.recipes.provider_name(),
                message
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}

/// Any non-POST method on the recipe route
pub async fn method_not_allowed(method: Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        format!("Method {} Not Allowed", method),
    )
        .into_response()
}

/// GET /images/:file
pub async fn get_image(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let key = match image_key(&file) {
        Ok(key) if key == format!("{}/{}", IMAGE_PREFIX, file) => key,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    match state.blobs.read(&key).await {
        Ok(Some(bytes)) => {
            let content_type = image::ImageFormat::from_path(&file)
                .map(|format| format.to_mime_type())
                .unwrap_or("application/octet-stream");
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(key = %key, "Failed to read image: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
