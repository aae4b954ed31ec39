use async_trait::async_trait;
use pantrygenie::providers::{CompletionResponse, Message, Provider};
use pantrygenie::server::{router, AppState};
use pantrygenie::storage::{BlobStore, FsBlobStore, InventoryStore};
use pantrygenie::recipes::RecipeService;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const PUBLIC_URL: &str = "http://localhost:3000";

#[allow(dead_code)]
pub fn create_temp_inventory() -> (InventoryStore, Arc<FsBlobStore>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let blobs = Arc::new(
        FsBlobStore::new(tmp.path().join("blobs"), PUBLIC_URL).expect("failed to create blob store"),
    );
    let store = InventoryStore::new_with_path(tmp.path().join("pantry.db"), blobs.clone())
        .expect("failed to create inventory store with path");
    (store, blobs, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Provider answering every prompt with the same text
#[allow(dead_code)]
pub struct FixedProvider(pub String);

#[async_trait]
impl Provider for FixedProvider {
    async fn complete(&self, _messages: &[Message]) -> pantrygenie::Result<CompletionResponse> {
        Ok(CompletionResponse::new(Message::assistant(self.0.clone())))
    }

    fn name(&self) -> &str {
        "Fixed"
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Serve the recipe router on an ephemeral port and return its base URL
#[allow(dead_code)]
pub async fn spawn_server(provider: Arc<dyn Provider>, blob_root: &std::path::Path) -> String {
    let blobs: Arc<dyn BlobStore> =
        Arc::new(FsBlobStore::new(blob_root, PUBLIC_URL).expect("failed to create blob store"));
    let app = router(AppState {
        recipes: Arc::new(RecipeService::new(provider)),
        blobs,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });
    format!("http://{}", addr)
}
