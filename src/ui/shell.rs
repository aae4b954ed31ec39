//! Interactive pantry shell
//!
//! A signed-out gate loop hands over to the main loop once a session
//! exists. The main loop holds the user's live inventory subscription and
//! drops it on sign-out.

use super::commands::{parse_command, parse_selection, print_help, print_sign_in_help, ShellCommand};
use super::search::{filter_items, DebouncedQuery};
use super::view::{self, UiFlags};
use crate::classifier::{Classifier, Prediction};
use crate::config::Config;
use crate::error::{PantryError, Result};
use crate::recipes::RecipeClient;
use crate::session::{LocalAuthProvider, SessionManager, UserSession};
use crate::storage::{
    BlobStore, FsBlobStore, InventoryItem, InventoryStore, InventorySubscription, RemoveOutcome,
};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How a main-loop session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    SignOut,
    Quit,
}

/// State held while a user is signed in
struct PantryView {
    user: UserSession,
    subscription: InventorySubscription,
    items: Vec<InventoryItem>,
    search: DebouncedQuery,
    query: String,
    recipes: Vec<String>,
    flags: UiFlags,
}

impl PantryView {
    /// Pull the newest snapshot if one arrived
    fn refresh(&mut self) {
        if self.subscription.has_changed() {
            self.items = self.subscription.latest();
        }
    }

    fn render(&mut self) -> String {
        self.refresh();
        view::render_inventory(&filter_items(&self.items, &self.query), &self.query)
    }

    fn ingredient_names(&mut self) -> Vec<String> {
        self.refresh();
        self.items.iter().map(|item| item.name.clone()).collect()
    }
}

/// Terminal front end for one local user at a time
pub struct PantryShell {
    session: SessionManager,
    store: InventoryStore,
    classifier: Arc<Classifier>,
    recipes: RecipeClient,
    search_window: Duration,
}

impl PantryShell {
    pub fn new(
        session: SessionManager,
        store: InventoryStore,
        classifier: Arc<Classifier>,
        recipes: RecipeClient,
        search_window: Duration,
    ) -> Self {
        Self {
            session,
            store,
            classifier,
            recipes,
            search_window,
        }
    }

    /// Build the shell from configuration
    ///
    /// Accounts and inventory share the configured database.
    ///
    /// # Errors
    ///
    /// Returns error if the database, blob directory or HTTP client cannot
    /// be set up
    pub fn from_config(config: &Config) -> Result<Self> {
        let db_path = config.storage.resolved_database_path()?;
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            config.storage.resolved_blob_dir()?,
            config.storage.public_base_url.clone(),
        )?);

        let auth = LocalAuthProvider::new_with_path(&db_path)?;
        let store = InventoryStore::new_with_path(&db_path, blobs)?;
        let recipes = RecipeClient::new(
            config.ui.recipes_endpoint.clone(),
            config.provider.timeout_seconds,
        )?;

        Ok(Self::new(
            SessionManager::new(Arc::new(auth)),
            store,
            Arc::new(Classifier::from_config(&config.classifier)),
            recipes,
            Duration::from_millis(config.ui.search_debounce_ms),
        ))
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Run the shell until the user quits
    pub async fn run(&self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        print_welcome_banner();

        loop {
            let Some(user) = self.sign_in_gate(&mut rl).await? else {
                break;
            };

            match self.main_loop(&mut rl, user).await? {
                LoopExit::SignOut => {
                    self.session.sign_out();
                    println!("{}\n", "Signed out.".green());
                }
                LoopExit::Quit => break,
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Prompt until someone signs in; `None` means quit
    async fn sign_in_gate(&self, rl: &mut DefaultEditor) -> Result<Option<UserSession>> {
        if let Some(user) = self.session.current() {
            return Ok(Some(user));
        }
        print_sign_in_help();

        loop {
            let line = match rl.readline(&view::prompt(None, &UiFlags::default())) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{}", view::render_error(&e.to_string()));
                    continue;
                }
            };
            let _ = rl.add_history_entry(line.trim());

            let result = match command {
                ShellCommand::SignIn(email) => {
                    let Some(password) = read_secret(rl, "Password: ")? else {
                        println!("{}", "Cancelled.".yellow());
                        continue;
                    };
                    self.session.sign_in(&email, &password).await
                }
                ShellCommand::SignUp(email) => {
                    let Some(password) = read_secret(rl, "Password: ")? else {
                        println!("{}", "Cancelled.".yellow());
                        continue;
                    };
                    let Some(confirm) = read_secret(rl, "Confirm password: ")? else {
                        println!("{}", "Cancelled.".yellow());
                        continue;
                    };
                    self.session.sign_up(&email, &password, &confirm).await
                }
                ShellCommand::Help => {
                    print_sign_in_help();
                    continue;
                }
                ShellCommand::Quit => return Ok(None),
                _ => {
                    println!("{}", view::render_error("Please sign in first."));
                    continue;
                }
            };

            match result {
                Ok(user) => {
                    println!("{} {}\n", "Signed in as".green(), user.email.cyan());
                    return Ok(Some(user));
                }
                Err(e) => println!("{}", view::render_error(&e.to_string())),
            }
        }
    }

    async fn main_loop(&self, rl: &mut DefaultEditor, user: UserSession) -> Result<LoopExit> {
        let subscription = self.store.subscribe(&user.user_id).await?;
        let mut pantry = PantryView {
            user,
            subscription,
            items: Vec::new(),
            search: DebouncedQuery::new(self.search_window),
            query: String::new(),
            recipes: Vec::new(),
            flags: UiFlags::default(),
        };
        pantry.items = pantry.subscription.latest();
        print!("{}", pantry.render());
        println!("Type 'help' for available commands\n");

        loop {
            let prompt = view::prompt(Some(&pantry.user.email), &pantry.flags);
            let line = match rl.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    return Ok(LoopExit::Quit)
                }
                Err(e) => return Err(e.into()),
            };

            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{}", view::render_error(&e.to_string()));
                    continue;
                }
            };
            let _ = rl.add_history_entry(line.trim());

            match command {
                ShellCommand::SignOut => return Ok(LoopExit::SignOut),
                ShellCommand::Quit => return Ok(LoopExit::Quit),
                ShellCommand::Help => print_help(),
                ShellCommand::SignIn(_) | ShellCommand::SignUp(_) => {
                    println!("{}", view::render_error("Sign out first."));
                }
                command => {
                    if let Err(e) = self.dispatch(rl, &mut pantry, command).await {
                        tracing::error!(user_id = %pantry.user.user_id, "Command failed: {:#}", e);
                        println!("{}", view::render_error(&e.to_string()));
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        rl: &mut DefaultEditor,
        pantry: &mut PantryView,
        command: ShellCommand,
    ) -> Result<()> {
        let user_id = pantry.user.user_id.clone();

        match command {
            ShellCommand::Add { name, image } => {
                let item = self.add_item(&user_id, &name, image.as_deref()).await?;
                println!("{} {} (x{})", "Added".green(), item.name.cyan(), item.quantity);
                print!("{}", pantry.render());
            }
            ShellCommand::Remove(name) => {
                match self.store.remove(&user_id, &name).await? {
                    RemoveOutcome::Decremented(item) => {
                        println!("{} {} (x{})", "Removed one".green(), item.name.cyan(), item.quantity)
                    }
                    RemoveOutcome::Deleted => println!("{} {}", "Removed".green(), name.cyan()),
                    RemoveOutcome::NotFound => {
                        println!("{}", format!("No item named '{}'", name).yellow())
                    }
                }
                print!("{}", pantry.render());
            }
            ShellCommand::Edit { old_name, new_name } => {
                if self.store.rename(&user_id, &old_name, &new_name).await? {
                    println!("{} {} -> {}", "Renamed".green(), old_name, new_name.cyan());
                } else {
                    println!("{}", "Nothing to rename.".yellow());
                }
                print!("{}", pantry.render());
            }
            ShellCommand::Upload { name, image } => {
                let item = self.attach_photo(&user_id, &name, &image).await?;
                println!("{} {}", "Updated photo for".green(), item.name.cyan());
                print!("{}", pantry.render());
            }
            ShellCommand::Capture(path) => {
                self.capture(rl, pantry, &path).await?;
            }
            ShellCommand::Search(query) => {
                pantry.search.set(query.unwrap_or_default());
                pantry.query = pantry.search.settled().await?;
                print!("{}", pantry.render());
            }
            ShellCommand::List => print!("{}", pantry.render()),
            ShellCommand::Recipes | ShellCommand::More => {
                let ingredients = pantry.ingredient_names();
                pantry.flags.loading_recipes = true;
                println!("{}", "Loading recipes...".dimmed());
                let result = self.recipes.suggest(&ingredients).await;
                pantry.flags.loading_recipes = false;

                pantry.recipes = result?;
                print!("{}", view::render_recipes(&pantry.recipes));
            }
            ShellCommand::SignIn(_)
            | ShellCommand::SignUp(_)
            | ShellCommand::SignOut
            | ShellCommand::Help
            | ShellCommand::Quit => {}
        }
        Ok(())
    }

    async fn capture(
        &self,
        rl: &mut DefaultEditor,
        pantry: &mut PantryView,
        path: &Path,
    ) -> Result<()> {
        println!("{}", "Analyzing photo...".dimmed());
        let predictions = self.classify_photo(&mut pantry.flags, path).await?;
        print!("{}", view::render_predictions(&predictions));
        if predictions.is_empty() {
            return Ok(());
        }

        let selection = match rl.readline("Add which items? (e.g. 1 3, blank to skip): ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let chosen = parse_selection(&selection, predictions.len())
            .map_err(|e| PantryError::Validation(e.to_string()))?;
        if chosen.is_empty() {
            return Ok(());
        }

        let labels: Vec<String> = chosen
            .into_iter()
            .map(|index| predictions[index].label.clone())
            .collect();
        let added = self
            .add_predictions(&pantry.user.user_id, &labels, path)
            .await?;
        for item in &added {
            println!("{} {} (x{})", "Added".green(), item.name.cyan(), item.quantity);
        }
        print!("{}", pantry.render());
        Ok(())
    }

    /// Store a photo file in the blob store and return its URL
    ///
    /// The blob is named after the file, so a later upload with the same
    /// file name replaces it.
    pub async fn upload_photo(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                PantryError::Validation(format!("Not a file name: {}", path.display()))
            })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PantryError::Blob(format!("Failed to read {}: {}", path.display(), e)))?;
        self.store.blobs().upload(file_name, bytes).await
    }

    /// Add one unit of an item, uploading its photo first if given
    pub async fn add_item(
        &self,
        user_id: &str,
        name: &str,
        image: Option<&Path>,
    ) -> Result<InventoryItem> {
        let image_url = match image {
            Some(path) => Some(self.upload_photo(path).await?),
            None => None,
        };
        self.store.add(user_id, name, image_url.as_deref()).await
    }

    /// Attach or replace the photo of an existing item
    pub async fn attach_photo(
        &self,
        user_id: &str,
        name: &str,
        image: &Path,
    ) -> Result<InventoryItem> {
        if self.store.get(user_id, name).await?.is_none() {
            return Err(PantryError::Validation(format!("No item named '{}'", name.trim())).into());
        }
        let url = self.upload_photo(image).await?;
        self.store
            .set_image(user_id, name, &url)
            .await?
            .ok_or_else(|| PantryError::Validation(format!("No item named '{}'", name.trim())).into())
    }

    /// Classify a photo while holding the analyzing flag
    ///
    /// # Errors
    ///
    /// Returns error if an analysis is already running or classification
    /// fails. The flag is cleared either way.
    pub async fn classify_photo(&self, flags: &mut UiFlags, path: &Path) -> Result<Vec<Prediction>> {
        if !flags.begin_analysis() {
            return Err(
                PantryError::Validation("A photo is already being analyzed.".to_string()).into(),
            );
        }
        let result = self.classifier.classify_path(path).await;
        flags.end_analysis();
        result
    }

    /// Add each selected prediction label, sharing one uploaded photo
    pub async fn add_predictions(
        &self,
        user_id: &str,
        labels: &[String],
        photo: &Path,
    ) -> Result<Vec<InventoryItem>> {
        let url = self.upload_photo(photo).await?;
        let mut added = Vec::with_capacity(labels.len());
        for label in labels {
            added.push(self.store.add(user_id, label, Some(&url)).await?);
        }
        Ok(added)
    }
}

/// Read a password line without recording it in history
///
/// `None` means the user cancelled with Ctrl-C or Ctrl-D.
fn read_secret(rl: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
    secret_from(rl.readline(prompt))
}

fn secret_from(line: std::result::Result<String, ReadlineError>) -> Result<Option<String>> {
    match line {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn print_welcome_banner() {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                  PantryGenie - Welcome!                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}
