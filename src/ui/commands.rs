//! Command parser for the pantry shell
//!
//! Input lines are parsed into [`ShellCommand`] values. Command words are
//! case-insensitive; item names keep the case they were typed with.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing shell input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType 'help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    /// Prediction selection contained something other than listed numbers
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

/// Commands accepted by the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Sign in with an existing account; the password is prompted for
    SignIn(String),

    /// Create an account; password and confirmation are prompted for
    SignUp(String),

    /// Add one unit of an item, optionally attaching a photo
    Add { name: String, image: Option<PathBuf> },

    /// Remove one unit of an item
    Remove(String),

    /// Rename an item
    Edit { old_name: String, new_name: String },

    /// Attach or replace the photo of an item
    Upload { name: String, image: PathBuf },

    /// Classify a photo and pick items from the predictions
    Capture(PathBuf),

    /// Set the search filter; `None` clears it
    Search(Option<String>),

    /// Show the current inventory
    List,

    /// Request recipes for everything in the pantry
    Recipes,

    /// Request another set of recipes, replacing the current ones
    More,

    SignOut,
    Help,
    Quit,
}

fn missing(command: &str, usage: &str) -> CommandError {
    CommandError::MissingArgument {
        command: command.to_string(),
        usage: usage.to_string(),
    }
}

fn required(command: &str, usage: &str, rest: &str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(missing(command, usage))
    } else {
        Ok(rest.to_string())
    }
}

/// Parse one line of shell input
///
/// Returns `Ok(None)` for blank input.
///
/// # Examples
///
/// ```
/// use pantrygenie::ui::commands::{parse_command, ShellCommand};
///
/// assert_eq!(
///     parse_command("remove Flour").unwrap(),
///     Some(ShellCommand::Remove("Flour".to_string()))
/// );
/// assert_eq!(parse_command("   ").unwrap(), None);
/// ```
pub fn parse_command(input: &str) -> Result<Option<ShellCommand>, CommandError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "signin" | "login" => {
            ShellCommand::SignIn(required("signin", "signin <email>", rest)?)
        }
        "signup" | "register" => {
            ShellCommand::SignUp(required("signup", "signup <email>", rest)?)
        }
        "add" => parse_add(rest)?,
        "remove" | "rm" => ShellCommand::Remove(required("remove", "remove <name>", rest)?),
        "edit" | "rename" => parse_edit(rest)?,
        "upload" => parse_upload(rest)?,
        "capture" => {
            let path = required("capture", "capture <image path>", rest)?;
            ShellCommand::Capture(PathBuf::from(path))
        }
        "search" | "find" => ShellCommand::Search(if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }),
        "list" | "ls" => ShellCommand::List,
        "recipes" => ShellCommand::Recipes,
        "more" => ShellCommand::More,
        "signout" | "logout" => ShellCommand::SignOut,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => return Err(CommandError::UnknownCommand(word.to_string())),
    };

    Ok(Some(command))
}

fn parse_add(rest: &str) -> Result<ShellCommand, CommandError> {
    const USAGE: &str = "add <name> [--image <path>]";

    let (name, image) = match rest.split_once("--image") {
        Some((name, path)) => {
            let path = path.trim();
            if path.is_empty() {
                return Err(missing("add --image", USAGE));
            }
            (name.trim(), Some(PathBuf::from(path)))
        }
        None => (rest, None),
    };

    Ok(ShellCommand::Add {
        name: required("add", USAGE, name)?,
        image,
    })
}

fn parse_edit(rest: &str) -> Result<ShellCommand, CommandError> {
    const USAGE: &str = "edit <old name> -> <new name>";

    let (old_name, new_name) = rest.split_once("->").ok_or_else(|| missing("edit", USAGE))?;
    Ok(ShellCommand::Edit {
        old_name: required("edit", USAGE, old_name.trim())?,
        new_name: required("edit", USAGE, new_name.trim())?,
    })
}

/// `upload <name> <path>`: the path is the last word, the name is the rest
fn parse_upload(rest: &str) -> Result<ShellCommand, CommandError> {
    const USAGE: &str = "upload <name> <image path>";

    let (name, path) = rest.rsplit_once(char::is_whitespace).ok_or_else(|| missing("upload", USAGE))?;
    Ok(ShellCommand::Upload {
        name: required("upload", USAGE, name.trim())?,
        image: PathBuf::from(path),
    })
}

/// Parse a prediction selection such as `1 3` or `1,2`
///
/// Numbers are 1-based and must be within `1..=available`. Duplicates are
/// dropped and the returned 0-based indexes keep the order they were typed.
/// Blank input selects nothing.
pub fn parse_selection(input: &str, available: usize) -> Result<Vec<usize>, CommandError> {
    let mut selected = Vec::new();
    for part in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
    {
        let number: usize = part
            .parse()
            .map_err(|_| CommandError::InvalidSelection(part.to_string()))?;
        if number == 0 || number > available {
            return Err(CommandError::InvalidSelection(format!(
                "{} (choose 1-{})",
                number, available
            )));
        }
        if !selected.contains(&(number - 1)) {
            selected.push(number - 1);
        }
    }
    Ok(selected)
}

/// Print help for the signed-out prompt
pub fn print_sign_in_help() {
    println!("\nSign in to manage your pantry:\n");
    println!("  signin <email>      Sign in to an existing account");
    println!("  signup <email>      Create an account");
    println!("  quit                Leave PantryGenie\n");
}

/// Print help for the signed-in prompt
pub fn print_help() {
    println!("\nPantry commands:\n");
    println!("  add <name> [--image <path>]   Add one unit (optionally with a photo)");
    println!("  remove <name>                 Remove one unit");
    println!("  edit <old> -> <new>           Rename an item");
    println!("  upload <name> <path>          Attach or replace an item photo");
    println!("  capture <path>                Recognise items in a photo");
    println!("  search [query]                Filter the list (no query clears)");
    println!("  list                          Show the pantry");
    println!("  recipes                       Suggest recipes from the pantry");
    println!("  more                          Suggest different recipes");
    println!("  signout                       Sign out");
    println!("  quit                          Leave PantryGenie\n");
}
