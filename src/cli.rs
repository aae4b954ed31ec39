//! Command-line interface definition for PantryGenie
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the recipe server, the interactive pantry shell,
//! one-off image classification and one-off recipe requests.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PantryGenie - pantry inventory tracker with recipe suggestions
///
/// Track what is in your pantry, recognise ingredients from photos and ask
/// a language model what to cook.
#[derive(Parser, Debug, Clone)]
#[command(name = "pantrygenie")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for PantryGenie
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the recipe server (`POST /api/get-recipes`, image hosting)
    Serve {
        /// Override the bind address from config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Start the interactive pantry shell
    Shell {
        /// Override the recipe endpoint URL from config
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Classify an image and print the predicted labels
    Classify {
        /// Path to the image file
        image: PathBuf,

        /// Maximum number of predictions to print
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Request recipe suggestions for a list of ingredients
    Recipes {
        /// Ingredient names
        #[arg(required = true)]
        ingredients: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
