//! Test utilities for PantryGenie
//!
//! Shared fixtures for unit tests: temporary stores and a scripted language
//! model provider.

use crate::error::{PantryError, Result};
use crate::providers::{CompletionResponse, Message, Provider};
use crate::storage::{FsBlobStore, InventoryStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Inventory store and blob store rooted in a fresh temporary directory
pub fn temp_inventory() -> (InventoryStore, Arc<FsBlobStore>, TempDir) {
    let dir = temp_dir();
    let blobs = Arc::new(
        FsBlobStore::new(dir.path().join("blobs"), "http://localhost:3000")
            .expect("Failed to create blob store"),
    );
    let store = InventoryStore::new_with_path(dir.path().join("pantry.db"), blobs.clone())
        .expect("Failed to create inventory store");
    (store, blobs, dir)
}

/// Provider returning a fixed reply (or error) and recording prompts
pub struct StubProvider {
    reply: std::result::Result<CompletionResponse, String>,
    prompts: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn replying(response: CompletionResponse) -> Self {
        Self {
            reply: Ok(response),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .extend(messages.iter().map(|m| m.content.clone()));
        match &self.reply {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(PantryError::Provider(message.clone()).into()),
        }
    }

    fn name(&self) -> &str {
        "Stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Assert that an error contains the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => assert!(
            e.to_string().contains(expected),
            "Expected error containing '{}', got '{}'",
            expected,
            e
        ),
    }
}
