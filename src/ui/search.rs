//! Local inventory search
//!
//! Filtering happens on the snapshot already held by the shell. Query
//! changes are debounced: a query is only applied once no newer one has
//! arrived for the whole quiescence window.

use crate::error::{PantryError, Result};
use crate::storage::InventoryItem;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Items whose name contains `query`, ignoring case
///
/// A blank query matches everything. Order is preserved.
///
/// # Examples
///
/// ```
/// use pantrygenie::storage::InventoryItem;
/// use pantrygenie::ui::search::filter_items;
///
/// let items = vec![InventoryItem::new("Egg", 1), InventoryItem::new("Flour", 2)];
/// let found = filter_items(&items, "FL");
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].name, "Flour");
/// ```
pub fn filter_items(items: &[InventoryItem], query: &str) -> Vec<InventoryItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Debounced search query
///
/// [`set`](Self::set) records a query immediately; the applied query only
/// changes after the window passes with no further `set`. Dropping the value
/// stops the background task.
pub struct DebouncedQuery {
    input: mpsc::UnboundedSender<String>,
    applied: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl DebouncedQuery {
    /// Start a debouncer with the given quiescence window
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(window: Duration) -> Self {
        let (input, mut queries) = mpsc::unbounded_channel::<String>();
        let (applied_tx, applied) = watch::channel(String::new());

        let task = tokio::spawn(async move {
            let mut pending: Option<String> = None;
            loop {
                let Some(query) = pending.take() else {
                    match queries.recv().await {
                        Some(query) => pending = Some(query),
                        None => break,
                    }
                    continue;
                };

                tokio::select! {
                    next = queries.recv() => match next {
                        Some(newer) => pending = Some(newer),
                        None => {
                            applied_tx.send_replace(query);
                            break;
                        }
                    },
                    _ = tokio::time::sleep(window) => {
                        tracing::debug!(query = %query, "Applying search filter");
                        applied_tx.send_replace(query);
                    }
                }
            }
        });

        Self {
            input,
            applied,
            task,
        }
    }

    /// Record a new query, restarting the window
    pub fn set(&self, query: impl Into<String>) {
        if self.input.send(query.into()).is_err() {
            tracing::warn!("Search debouncer has stopped");
        }
    }

    /// The query currently applied
    pub fn current(&self) -> String {
        self.applied.borrow().clone()
    }

    /// Receiver notified each time a query is applied
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.applied.clone()
    }

    /// Wait until the next query is applied and return it
    ///
    /// # Errors
    ///
    /// Returns error if the background task has stopped
    pub async fn settled(&mut self) -> Result<String> {
        self.applied
            .changed()
            .await
            .map_err(|_| PantryError::Validation("Search debouncer has stopped".to_string()))?;
        Ok(self.applied.borrow_and_update().clone())
    }
}

impl Drop for DebouncedQuery {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn pantry() -> Vec<InventoryItem> {
        vec![
            InventoryItem::new("Egg", 6),
            InventoryItem::new("Flour", 1),
            InventoryItem::new("Milk", 2),
        ]
    }

    fn names(items: &[InventoryItem]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[test]
    fn test_filter_case_insensitive_substring() {
        assert_eq!(names(&filter_items(&pantry(), "fl")), vec!["Flour"]);
        assert_eq!(names(&filter_items(&pantry(), "I")), vec!["Milk"]);
    }

    #[test]
    fn test_filter_blank_query_matches_all() {
        assert_eq!(names(&filter_items(&pantry(), "  ")), vec!["Egg", "Flour", "Milk"]);
    }

    #[test]
    fn test_filter_no_match() {
        assert!(filter_items(&pantry(), "sugar").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_applies_only_final_query() {
        let debounced = DebouncedQuery::new(Duration::from_millis(300));
        let mut applied = debounced.subscribe();

        debounced.set("f");
        tokio::time::advance(Duration::from_millis(100)).await;
        debounced.set("fl");
        let last_keystroke = Instant::now();
        tokio::time::advance(Duration::from_millis(200)).await;

        assert!(!applied.has_changed().unwrap());

        applied.changed().await.unwrap();
        assert!(last_keystroke.elapsed() >= Duration::from_millis(300));
        let query = applied.borrow_and_update().clone();
        assert_eq!(query, "fl");
        assert_eq!(names(&filter_items(&pantry(), &query)), vec!["Flour"]);
        assert!(!applied.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_returns_applied_query() {
        let mut debounced = DebouncedQuery::new(Duration::from_millis(300));
        debounced.set("milk");
        assert_eq!(debounced.settled().await.unwrap(), "milk");
        assert_eq!(debounced.current(), "milk");
    }
}
