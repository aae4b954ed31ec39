//! PantryGenie - pantry inventory tracker library
//!
//! This library provides the core functionality for PantryGenie: per-user
//! pantry inventory with live updates, item photos, local ingredient
//! recognition and recipe suggestions from a hosted language model.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Sign-in, sign-up and the current identity
//! - `storage`: Inventory documents, live subscriptions and the image blob store
//! - `classifier`: Lazily loaded image classification network
//! - `providers`: Language model provider abstraction (OpenRouter, Gemini)
//! - `recipes`: Prompt building, recipe server service and endpoint client
//! - `server`: HTTP server exposing `POST /api/get-recipes`
//! - `ui`: Terminal presentation layer
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use pantrygenie::recipes::RecipeClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RecipeClient::new("http://127.0.0.1:3000/api/get-recipes", 30)?;
//!     let recipes = client.suggest(&["egg".to_string(), "flour".to_string()]).await?;
//!     println!("{}", recipes.join("\n\n"));
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod recipes;
pub mod server;
pub mod session;
pub mod storage;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use error::{PantryError, Result};
pub use session::{SessionManager, UserSession};
pub use storage::{InventoryItem, InventoryStore};

#[cfg(test)]
pub mod test_utils;
