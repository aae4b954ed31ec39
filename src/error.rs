//! Error types for PantryGenie
//!
//! This module defines the error categories used throughout the application,
//! using `thiserror` for ergonomic error handling. Call sites propagate with
//! `anyhow` (see [`Result`]) and downcast to [`PantryError`] where the
//! category matters, such as mapping recipe failures to HTTP status codes.

use thiserror::Error;

/// Main error type for PantryGenie operations
///
/// Each variant corresponds to one external collaborator or one layer of the
/// application, so a failure can be attributed to the action that caused it.
#[derive(Error, Debug)]
pub enum PantryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failures (wrong password, duplicate account, ...)
    ///
    /// The message is shown to the user verbatim.
    #[error("{0}")]
    Auth(String),

    /// Inventory document store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Blob (image) store errors
    #[error("Blob store error: {0}")]
    Blob(String),

    /// Image classifier errors (model load, decode, inference)
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Language model provider errors (API calls, authentication, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Request validation errors
    #[error("{0}")]
    Validation(String),

    /// Recipe endpoint returned an error to the client
    #[error("{0}")]
    Recipe(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image decoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for PantryGenie operations
///
/// Uses `anyhow::Error` so call sites can attach context while the
/// underlying [`PantryError`] stays available through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = PantryError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_auth_error_is_shown_verbatim() {
        let error = PantryError::Auth("Passwords do not match".to_string());
        assert_eq!(error.to_string(), "Passwords do not match");
    }

    #[test]
    fn test_validation_error_display() {
        let error =
            PantryError::Validation("Invalid request: 'ingredients' must be an array.".into());
        assert!(error.to_string().contains("must be an array"));
    }

    #[test]
    fn test_provider_error_display() {
        let error = PantryError::Provider("API timeout".to_string());
        assert_eq!(error.to_string(), "Provider error: API timeout");
    }

    #[test]
    fn test_missing_credentials_error_display() {
        let error = PantryError::MissingCredentials("openrouter".to_string());
        assert_eq!(
            error.to_string(),
            "Missing credentials for provider: openrouter"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: PantryError = io_error.into();
        assert!(matches!(error, PantryError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: PantryError = json_error.into();
        assert!(matches!(error, PantryError::Serialization(_)));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let result: Result<()> = Err(PantryError::Storage("locked".to_string()).into());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::Storage(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PantryError>();
    }
}
