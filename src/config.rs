//! Configuration management for PantryGenie
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Provider API keys are deliberately absent: they are read from the
//! environment when a provider is constructed.

use crate::error::{PantryError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for PantryGenie
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Recipe server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Inventory database and blob storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Language model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Image classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Interactive shell settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recipe server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Storage configuration
///
/// Unset paths resolve to the platform data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding accounts and inventory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Root directory of the blob store; images land in `<blob_dir>/images`
    #[serde(default)]
    pub blob_dir: Option<PathBuf>,

    /// Base URL under which stored images are publicly resolvable
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            blob_dir: None,
            public_base_url: default_public_base_url(),
        }
    }
}

impl StorageConfig {
    /// Resolve the database path, falling back to the platform data directory
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("pantry.db")),
        }
    }

    /// Resolve the blob root, falling back to the platform data directory
    pub fn resolved_blob_dir(&self) -> Result<PathBuf> {
        match &self.blob_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("blobs")),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "pantrygenie", "pantrygenie").ok_or_else(|| {
        PantryError::Config("Could not determine data directory".to_string())
    })?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// Language model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use ("openrouter" or "gemini")
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenRouter (OpenAI-compatible) configuration
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Per-request timeout for upstream calls (seconds)
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_provider_type() -> String {
    "openrouter".to_string()
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openrouter: OpenRouterConfig::default(),
            gemini: GeminiConfig::default(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

/// OpenRouter provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API base URL; `/chat/completions` is appended
    #[serde(default = "default_openrouter_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_openrouter_model")]
    pub model: String,
}

fn default_openrouter_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_openrouter_model() -> String {
    "meta-llama/llama-3.1-8b-instruct:free".to_string()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: default_openrouter_api_base(),
            model: default_openrouter_model(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API base URL; `/models/<model>:generateContent` is appended
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: default_gemini_api_base(),
            model: default_gemini_model(),
        }
    }
}

/// Image classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the ONNX classification model
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Path to the newline-separated labels file
    #[serde(default)]
    pub labels_path: Option<PathBuf>,

    /// Square input edge length expected by the model
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    /// Maximum number of predictions returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Predictions below this confidence are dropped
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Only keep labels on the built-in food allow-list
    #[serde(default)]
    pub food_filter: bool,
}

fn default_input_size() -> u32 {
    224
}

fn default_top_k() -> usize {
    5
}

fn default_min_confidence() -> f32 {
    0.05
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            input_size: default_input_size(),
            top_k: default_top_k(),
            min_confidence: default_min_confidence(),
            food_filter: false,
        }
    }
}

/// Interactive shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Full URL of the recipe endpoint
    #[serde(default = "default_recipes_endpoint")]
    pub recipes_endpoint: String,

    /// Quiescence window for the search filter (milliseconds)
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

fn default_recipes_endpoint() -> String {
    "http://127.0.0.1:3000/api/get-recipes".to_string()
}

fn default_search_debounce_ms() -> u64 {
    300
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            recipes_endpoint: default_recipes_endpoint(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PantryError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PantryError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(bind) = std::env::var("PANTRY_BIND") {
            self.server.bind = bind;
        }

        if let Ok(db) = std::env::var("PANTRY_DB") {
            self.storage.database_path = Some(PathBuf::from(db));
        }

        if let Ok(blob_dir) = std::env::var("PANTRY_BLOB_DIR") {
            self.storage.blob_dir = Some(PathBuf::from(blob_dir));
        }

        if let Ok(public_url) = std::env::var("PANTRY_PUBLIC_URL") {
            self.storage.public_base_url = public_url;
        }

        if let Ok(provider_type) = std::env::var("PANTRY_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        // Applies to whichever provider is selected
        if let Ok(model) = std::env::var("PANTRY_MODEL") {
            match self.provider.provider_type.as_str() {
                "gemini" => self.provider.gemini.model = model,
                _ => self.provider.openrouter.model = model,
            }
        }

        if let Ok(model_path) = std::env::var("PANTRY_CLASSIFIER_MODEL") {
            self.classifier.model_path = Some(PathBuf::from(model_path));
        }

        if let Ok(labels_path) = std::env::var("PANTRY_CLASSIFIER_LABELS") {
            self.classifier.labels_path = Some(PathBuf::from(labels_path));
        }

        if let Ok(endpoint) = std::env::var("PANTRY_RECIPES_ENDPOINT") {
            self.ui.recipes_endpoint = endpoint;
        }

        if let Ok(debounce) = std::env::var("PANTRY_SEARCH_DEBOUNCE_MS") {
            if let Ok(value) = debounce.parse() {
                self.ui.search_debounce_ms = value;
            } else {
                tracing::warn!("Invalid PANTRY_SEARCH_DEBOUNCE_MS: {}", debounce);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        match &cli.command {
            crate::cli::Commands::Serve { bind: Some(bind) } => {
                self.server.bind = bind.clone();
            }
            crate::cli::Commands::Shell {
                endpoint: Some(endpoint),
            } => {
                self.ui.recipes_endpoint = endpoint.clone();
            }
            crate::cli::Commands::Classify {
                top_k: Some(top_k), ..
            } => {
                self.classifier.top_k = *top_k;
            }
            _ => {}
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["openrouter", "gemini"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(PantryError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(PantryError::Config(format!(
                "server.bind is not a valid socket address: {}",
                self.server.bind
            ))
            .into());
        }

        if url::Url::parse(&self.storage.public_base_url).is_err() {
            return Err(PantryError::Config(format!(
                "storage.public_base_url is not a valid URL: {}",
                self.storage.public_base_url
            ))
            .into());
        }

        if url::Url::parse(&self.ui.recipes_endpoint).is_err() {
            return Err(PantryError::Config(format!(
                "ui.recipes_endpoint is not a valid URL: {}",
                self.ui.recipes_endpoint
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(PantryError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.classifier.input_size == 0 {
            return Err(PantryError::Config(
                "classifier.input_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.classifier.top_k == 0 {
            return Err(
                PantryError::Config("classifier.top_k must be greater than 0".to_string()).into(),
            );
        }

        if !(0.0..=1.0).contains(&self.classifier.min_confidence) {
            return Err(PantryError::Config(
                "classifier.min_confidence must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
