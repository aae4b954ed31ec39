use serde::{Deserialize, Serialize};

/// One ingredient in a user's pantry
///
/// The name is the item's key within the owning user's collection.
/// `quantity` is at least 1 for as long as the item exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item name, unique per user
    pub name: String,
    /// Number of units on hand
    pub quantity: u32,
    /// Public URL of the item's photo, if one was uploaded
    pub image_url: Option<String>,
}

impl InventoryItem {
    /// Create an item without a photo
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
            image_url: None,
        }
    }

    /// Attach a photo URL
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// What a `remove` call did to the item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Quantity went down by one; the remaining item is returned
    Decremented(InventoryItem),
    /// The last unit was removed and the item document deleted
    Deleted,
    /// No item with that name exists
    NotFound,
}
