//! Rendering for the pantry shell
//!
//! Everything here returns a `String` so the shell decides where it goes.

use crate::classifier::Prediction;
use crate::storage::InventoryItem;
use colored::Colorize;
use prettytable::{format, row, Table};

/// Transient view state
///
/// Nothing here outlives the shell process.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UiFlags {
    /// A recipe request is in flight
    pub loading_recipes: bool,
    /// A photo is being classified
    pub analyzing: bool,
}

impl UiFlags {
    /// Mark a classification as started
    ///
    /// Returns false if one is already running.
    pub fn begin_analysis(&mut self) -> bool {
        if self.analyzing {
            return false;
        }
        self.analyzing = true;
        true
    }

    pub fn end_analysis(&mut self) {
        self.analyzing = false;
    }
}

/// Render the (filtered) inventory as a table
pub fn render_inventory(items: &[InventoryItem], query: &str) -> String {
    if items.is_empty() {
        let message = if query.trim().is_empty() {
            "Your pantry is empty. Use 'add <name>' to stock it.".to_string()
        } else {
            format!("No items match '{}'.", query.trim())
        };
        return format!("{}\n", message.yellow());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["Item".bold(), "Qty".bold(), "Photo".bold()]);

    for item in items {
        let photo = item.image_url.as_deref().unwrap_or("-");
        table.add_row(row![item.name.cyan(), item.quantity, photo]);
    }

    let mut out = String::new();
    if !query.trim().is_empty() {
        out.push_str(&format!("Filter: {}\n", query.trim().cyan()));
    }
    out.push_str(&table.to_string());
    out
}

/// Render classifier predictions as a numbered list for selection
pub fn render_predictions(predictions: &[Prediction]) -> String {
    if predictions.is_empty() {
        return format!("{}\n", "No ingredients recognised in that photo.".yellow());
    }

    let mut out = String::from("Recognised:\n");
    for (index, prediction) in predictions.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} ({:.1}%)\n",
            index + 1,
            prediction.label.green(),
            prediction.confidence * 100.0
        ));
    }
    out
}

/// Render recipe suggestions
pub fn render_recipes(recipes: &[String]) -> String {
    let mut out = String::new();
    for (index, recipe) in recipes.iter().enumerate() {
        let title = format!("Recipe {}", index + 1);
        out.push_str(&format!("\n{}\n{}\n", title.bold().green(), recipe));
    }
    out
}

/// Render an error for display
pub fn render_error(message: &str) -> String {
    format!("{} {}", "Error:".red().bold(), message.red())
}

/// Shell prompt for the current identity
pub fn prompt(email: Option<&str>, flags: &UiFlags) -> String {
    let status = if flags.analyzing {
        " [analyzing]"
    } else if flags.loading_recipes {
        " [loading recipes]"
    } else {
        ""
    };
    match email {
        Some(email) => format!("[{}]{} >> ", email, status),
        None => "[signed out] >> ".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_flag_rejects_second_start() {
        let mut flags = UiFlags::default();
        assert!(flags.begin_analysis());
        assert!(!flags.begin_analysis());
        flags.end_analysis();
        assert!(flags.begin_analysis());
    }

    #[test]
    fn test_render_inventory_lists_items() {
        let items = vec![
            InventoryItem::new("Egg", 6),
            InventoryItem::new("Apple", 2).with_image("http://localhost:3000/images/apple.jpg"),
        ];
        let out = render_inventory(&items, "");
        assert!(out.contains("Egg"));
        assert!(out.contains('6'));
        assert!(out.contains("http://localhost:3000/images/apple.jpg"));
        assert!(!out.contains("Filter:"));
    }

    #[test]
    fn test_render_inventory_empty_states() {
        assert!(render_inventory(&[], "").contains("pantry is empty"));
        assert!(render_inventory(&[], "xyz").contains("No items match 'xyz'"));
    }

    #[test]
    fn test_render_predictions_numbered() {
        let out = render_predictions(&[
            Prediction::new("banana", 0.9),
            Prediction::new("lemon", 0.05),
        ]);
        assert!(out.contains("1."));
        assert!(out.contains("banana"));
        assert!(out.contains("90.0%"));
        assert!(out.contains("2."));
    }

    #[test]
    fn test_render_recipes() {
        let out = render_recipes(&["Pancakes".to_string(), "Crepes".to_string()]);
        assert!(out.contains("Recipe 1"));
        assert!(out.contains("Crepes"));
    }

    #[test]
    fn test_prompt_shows_status() {
        let mut flags = UiFlags::default();
        assert_eq!(prompt(None, &flags), "[signed out] >> ");
        flags.loading_recipes = true;
        assert_eq!(
            prompt(Some("ada@example.com"), &flags),
            "[ada@example.com] [loading recipes] >> "
        );
    }
}
