//! PantryGenie - pantry inventory tracker
//!
#![doc = "PantryGenie - pantry inventory tracker"]
#![doc = "Main entry point for the PantryGenie application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pantrygenie::cli::{Cli, Commands};
use pantrygenie::commands;
use pantrygenie::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Initialize tracing
    init_tracing(cli.verbose, config.logging.json);

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Shell { .. } => {
            tracing::info!("Starting interactive shell");
            commands::shell::run_shell(config).await?;
            Ok(())
        }
        Commands::Classify { image, .. } => {
            commands::classify::run_classify(config, &image).await?;
            Ok(())
        }
        Commands::Recipes { ingredients } => {
            tracing::debug!("Requesting recipes for {} ingredients", ingredients.len());
            commands::recipes::run_recipes(config, ingredients).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins over the defaults; `--verbose` raises the default level
/// to debug.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "pantrygenie=debug"
    } else {
        "pantrygenie=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
