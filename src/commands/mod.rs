/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes four top-level command modules:

- `serve`    : Recipe server
- `shell`    : Interactive pantry shell
- `classify` : One-off image classification
- `recipes`  : One-off recipe request against the endpoint

The handlers are thin: they build library components from configuration
and print results.
*/

use crate::config::Config;
use crate::error::Result;

// Recipe server handler
pub mod serve {
    //! Runs the HTTP recipe server until Ctrl-C.

    use super::*;

    /// Start the recipe server
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration, including the bind address and
    ///   provider selection
    pub async fn run_serve(config: Config) -> Result<()> {
        tracing::info!(
            provider = %config.provider.provider_type,
            bind = %config.server.bind,
            "Starting recipe server"
        );
        crate::server::serve(&config).await
    }
}

// Interactive shell handler
pub mod shell {
    //! Interactive pantry shell.
    //!
    //! Builds the session manager, inventory store, classifier and recipe
    //! client, then hands control to the readline loop.

    use super::*;
    use crate::ui::PantryShell;

    /// Start the interactive shell
    pub async fn run_shell(config: Config) -> Result<()> {
        tracing::info!(endpoint = %config.ui.recipes_endpoint, "Starting pantry shell");
        let shell = PantryShell::from_config(&config)?;
        shell.run().await
    }
}

// Classification handler
pub mod classify {
    //! Classifies a single image and prints the predictions.

    use super::*;
    use crate::classifier::Classifier;
    use crate::ui::view;
    use std::path::Path;

    /// Print predictions for the image at `image`
    ///
    /// # Errors
    ///
    /// Returns error if the model is not configured or the image cannot be
    /// read or decoded
    pub async fn run_classify(config: Config, image: &Path) -> Result<()> {
        let classifier = Classifier::from_config(&config.classifier);
        tracing::debug!("Classifying {}", image.display());

        let predictions = classifier.classify_path(image).await?;
        print!("{}", view::render_predictions(&predictions));
        Ok(())
    }
}

// Recipe request handler
pub mod recipes {
    //! Requests recipes for ingredients given on the command line.

    use super::*;
    use crate::recipes::RecipeClient;
    use crate::ui::view;

    /// Ask the recipe endpoint for suggestions and print them
    pub async fn run_recipes(config: Config, ingredients: Vec<String>) -> Result<()> {
        let client = RecipeClient::new(
            config.ui.recipes_endpoint.clone(),
            config.provider.timeout_seconds,
        )?;

        let recipes = client.suggest(&ingredients).await?;
        print!("{}", view::render_recipes(&recipes));
        println!();
        Ok(())
    }
}
