//! Terminal presentation layer
//!
//! - [`commands`]: shell input parsing
//! - [`search`]: local filtering with a debounced query
//! - [`view`]: table and message rendering plus transient UI flags
//! - [`shell`]: the interactive loop

pub mod commands;
pub mod search;
pub mod shell;
pub mod view;

pub use commands::{parse_command, ShellCommand};
pub use search::{filter_items, DebouncedQuery};
pub use shell::PantryShell;
pub use view::UiFlags;
