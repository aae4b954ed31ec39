use crate::error::{PantryError, Result};
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub mod blob;
pub mod types;
pub use blob::{BlobStore, FsBlobStore};
pub use types::{InventoryItem, RemoveOutcome};

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Live snapshot channels, one per subscribed user
type Channels = Arc<Mutex<HashMap<String, watch::Sender<Vec<InventoryItem>>>>>;

/// Row-level result of a remove transaction
enum RemovedRow {
    Missing,
    Decremented(InventoryItem),
    /// Carries the photo URL left without any item
    Deleted(Option<String>),
}

/// Per-user inventory collection backed by SQLite
///
/// Every mutation commits first and then publishes the full item list to
/// the user's live subscribers.
pub struct InventoryStore {
    db_path: PathBuf,
    blobs: Arc<dyn BlobStore>,
    channels: Channels,
}

impl InventoryStore {
    /// Create a store that uses the specified database path
    ///
    /// # Examples
    ///
    /// ```
    /// use pantrygenie::storage::{FsBlobStore, InventoryStore};
    /// use std::sync::Arc;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let blobs = Arc::new(FsBlobStore::new(dir.path().join("blobs"), "http://localhost:3000").unwrap());
    /// let store = InventoryStore::new_with_path(dir.path().join("pantry.db"), blobs).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P, blobs: Arc<dyn BlobStore>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
        }

        let store = Self {
            db_path,
            blobs,
            channels: Arc::new(Mutex::new(HashMap::new())),
        };
        store.init()?;
        Ok(store)
    }

    /// The blob store used for item photos
    pub fn blobs(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.blobs)
    }

    fn init(&self) -> Result<()> {
        let conn = open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS inventory (
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity >= 1),
                image_url TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, name)
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

        Ok(())
    }

    /// Add one unit of `name`
    ///
    /// Creates the item with quantity 1 if it does not exist. The stored
    /// photo URL is only replaced when `image_url` is supplied; a replaced
    /// photo that no other item uses is deleted best-effort.
    pub async fn add(
        &self,
        user_id: &str,
        name: &str,
        image_url: Option<&str>,
    ) -> Result<InventoryItem> {
        let name = validate_name(name)?;
        let user = user_id.to_string();
        let image_url = image_url.map(str::to_string);

        let (item, orphaned) = self
            .blocking(move |conn| {
                let tx = begin_write(conn)?;
                let previous = image_of(&tx, &user, &name)?.flatten();

                let item = tx
                    .query_row(
                        "INSERT INTO inventory (user_id, name, quantity, image_url, updated_at)
                        VALUES (?1, ?2, 1, ?3, ?4)
                        ON CONFLICT(user_id, name) DO UPDATE SET
                            quantity = inventory.quantity + 1,
                            image_url = COALESCE(excluded.image_url, inventory.image_url),
                            updated_at = excluded.updated_at
                        RETURNING name, quantity, image_url",
                        params![user, name, image_url, Utc::now().to_rfc3339()],
                        item_from_row,
                    )
                    .context("Failed to add item")
                    .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

                let orphaned = orphaned_photo(&tx, previous, item.image_url.as_deref())?;
                commit(tx)?;
                Ok((item, orphaned))
            })
            .await?;

        tracing::debug!(user_id = %user_id, item = %item.name, quantity = item.quantity, "Added item");
        self.publish(user_id).await;
        self.discard_photo(orphaned).await;
        Ok(item)
    }

    /// Remove one unit of `name`
    ///
    /// The last unit deletes the item and, best-effort, its photo when no
    /// other item uses it. Removing a missing item changes nothing.
    pub async fn remove(&self, user_id: &str, name: &str) -> Result<RemoveOutcome> {
        let user = user_id.to_string();
        let item_name = name.trim().to_string();

        let removed = self
            .blocking(move |conn| {
                let tx = begin_write(conn)?;

                let existing = tx
                    .query_row(
                        "SELECT name, quantity, image_url FROM inventory
                        WHERE user_id = ?1 AND name = ?2",
                        params![user, item_name],
                        item_from_row,
                    )
                    .optional()
                    .context("Failed to query item")
                    .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

                let removed = match existing {
                    None => RemovedRow::Missing,
                    Some(item) if item.quantity > 1 => {
                        tx.execute(
                            "UPDATE inventory SET quantity = quantity - 1, updated_at = ?3
                            WHERE user_id = ?1 AND name = ?2",
                            params![user, item_name, Utc::now().to_rfc3339()],
                        )
                        .context("Failed to decrement item")
                        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
                        RemovedRow::Decremented(InventoryItem {
                            quantity: item.quantity - 1,
                            ..item
                        })
                    }
                    Some(item) => {
                        tx.execute(
                            "DELETE FROM inventory WHERE user_id = ?1 AND name = ?2",
                            params![user, item_name],
                        )
                        .context("Failed to delete item")
                        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
                        RemovedRow::Deleted(orphaned_photo(&tx, item.image_url, None)?)
                    }
                };

                commit(tx)?;
                Ok(removed)
            })
            .await?;

        match removed {
            RemovedRow::Missing => {
                tracing::debug!(user_id = %user_id, item = %name, "Remove of missing item ignored");
                Ok(RemoveOutcome::NotFound)
            }
            RemovedRow::Decremented(item) => {
                self.publish(user_id).await;
                Ok(RemoveOutcome::Decremented(item))
            }
            RemovedRow::Deleted(orphaned) => {
                self.publish(user_id).await;
                self.discard_photo(orphaned).await;
                tracing::debug!(user_id = %user_id, item = %name, "Deleted item");
                Ok(RemoveOutcome::Deleted)
            }
        }
    }

    /// Move an item to a new name, keeping quantity and photo
    ///
    /// Runs as one transaction. Returns `false` when nothing changed: equal
    /// names or a missing source item. An existing item under `new_name` is
    /// overwritten, and its photo is deleted best-effort when nothing else
    /// uses it.
    pub async fn rename(&self, user_id: &str, old_name: &str, new_name: &str) -> Result<bool> {
        let old_name = old_name.trim().to_string();
        let new_name = validate_name(new_name)?;
        if old_name == new_name {
            return Ok(false);
        }

        let user = user_id.to_string();
        let (from, to) = (old_name.clone(), new_name.clone());

        let renamed = self
            .blocking(move |conn| {
                let tx = begin_write(conn)?;

                let existing = tx
                    .query_row(
                        "SELECT name, quantity, image_url FROM inventory
                        WHERE user_id = ?1 AND name = ?2",
                        params![user, from],
                        item_from_row,
                    )
                    .optional()
                    .context("Failed to query item")
                    .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

                let Some(item) = existing else {
                    return Ok(None);
                };
                let overwritten = image_of(&tx, &user, &to)?.flatten();

                tx.execute(
                    "INSERT INTO inventory (user_id, name, quantity, image_url, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(user_id, name) DO UPDATE SET
                        quantity = excluded.quantity,
                        image_url = excluded.image_url,
                        updated_at = excluded.updated_at",
                    params![
                        user,
                        to,
                        item.quantity,
                        item.image_url,
                        Utc::now().to_rfc3339()
                    ],
                )
                .context("Failed to write renamed item")
                .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

                tx.execute(
                    "DELETE FROM inventory WHERE user_id = ?1 AND name = ?2",
                    params![user, from],
                )
                .context("Failed to delete old item")
                .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

                let orphaned = orphaned_photo(&tx, overwritten, item.image_url.as_deref())?;
                commit(tx)?;
                Ok(Some(orphaned))
            })
            .await?;

        let Some(orphaned) = renamed else {
            return Ok(false);
        };

        tracing::debug!(user_id = %user_id, from = %old_name, to = %new_name, "Renamed item");
        self.publish(user_id).await;
        self.discard_photo(orphaned).await;
        Ok(true)
    }

    /// Attach or replace the photo of an existing item
    ///
    /// Quantity is unchanged. A previous photo at a different URL is deleted
    /// best-effort unless another item still uses it. Returns `None` if the
    /// item does not exist.
    pub async fn set_image(
        &self,
        user_id: &str,
        name: &str,
        image_url: &str,
    ) -> Result<Option<InventoryItem>> {
        let user = user_id.to_string();
        let item_name = name.trim().to_string();
        let url = image_url.to_string();

        let updated = self
            .blocking(move |conn| {
                let tx = begin_write(conn)?;

                let Some(previous) = image_of(&tx, &user, &item_name)? else {
                    return Ok(None);
                };

                let item = tx
                    .query_row(
                        "UPDATE inventory SET image_url = ?3, updated_at = ?4
                        WHERE user_id = ?1 AND name = ?2
                        RETURNING name, quantity, image_url",
                        params![user, item_name, url, Utc::now().to_rfc3339()],
                        item_from_row,
                    )
                    .context("Failed to update image")
                    .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

                let orphaned = orphaned_photo(&tx, previous, Some(url.as_str()))?;
                commit(tx)?;
                Ok(Some((item, orphaned)))
            })
            .await?;

        let Some((item, orphaned)) = updated else {
            return Ok(None);
        };

        tracing::debug!(user_id = %user_id, item = %item.name, "Updated item photo");
        self.publish(user_id).await;
        self.discard_photo(orphaned).await;
        Ok(Some(item))
    }

    /// All items for a user, ordered by name
    pub async fn list(&self, user_id: &str) -> Result<Vec<InventoryItem>> {
        let user = user_id.to_string();
        self.blocking(move |conn| query_items(conn, &user)).await
    }

    /// A single item by name
    pub async fn get(&self, user_id: &str, name: &str) -> Result<Option<InventoryItem>> {
        let user = user_id.to_string();
        let name = name.trim().to_string();
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT name, quantity, image_url FROM inventory
                WHERE user_id = ?1 AND name = ?2",
                params![user, name],
                item_from_row,
            )
            .optional()
            .context("Failed to query item")
            .map_err(|e| PantryError::Storage(format!("{:#}", e)).into())
        })
        .await
    }

    /// Open a live view of a user's items
    ///
    /// The current list is available immediately. Every later mutation
    /// delivers the full list again. Dropping the subscription tears it
    /// down.
    pub async fn subscribe(&self, user_id: &str) -> Result<InventorySubscription> {
        let db_path = self.db_path.clone();
        let channels = Arc::clone(&self.channels);
        let user = user_id.to_string();

        let receiver = run_blocking(move || {
            // Snapshot and send under the lock so a concurrent publish can
            // never be overwritten by an older list.
            let mut map = lock_channels(&channels);
            let conn = open(&db_path)?;
            let items = query_items(&conn, &user)?;

            let receiver = match map.get(&user) {
                Some(sender) if sender.receiver_count() > 0 => {
                    sender.send_if_modified(|current| {
                        if *current == items {
                            false
                        } else {
                            *current = items;
                            true
                        }
                    });
                    sender.subscribe()
                }
                _ => {
                    let (sender, receiver) = watch::channel(items);
                    map.insert(user.clone(), sender);
                    receiver
                }
            };
            Ok(receiver)
        })
        .await?;

        tracing::debug!(user_id = %user_id, "Opened inventory subscription");
        Ok(InventorySubscription {
            user_id: user_id.to_string(),
            receiver,
        })
    }

    /// Number of live subscriptions for a user
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        lock_channels(&self.channels)
            .get(user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Deliver the current list to a user's subscribers
    ///
    /// Channels without receivers are dropped here. A failed snapshot is
    /// logged; the mutation that triggered it has already committed.
    async fn publish(&self, user_id: &str) {
        let db_path = self.db_path.clone();
        let channels = Arc::clone(&self.channels);
        let user = user_id.to_string();

        let result = run_blocking(move || {
            let mut map = lock_channels(&channels);
            let Some(sender) = map.get(&user) else {
                return Ok(());
            };
            if sender.receiver_count() == 0 {
                map.remove(&user);
                return Ok(());
            }

            let conn = open(&db_path)?;
            let items = query_items(&conn, &user)?;
            sender.send_replace(items);
            Ok(())
        })
        .await;

        if let Err(e) = result {
            tracing::error!(user_id = %user_id, "Failed to publish inventory snapshot: {:#}", e);
        }
    }

    async fn discard_photo(&self, orphaned: Option<String>) {
        if let Some(url) = orphaned {
            blob::delete_best_effort(self.blobs.as_ref(), &url).await;
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.db_path.clone();
        run_blocking(move || {
            let mut conn = open(&db_path)?;
            f(&mut conn)
        })
        .await
    }
}

/// Live inventory view for one user
///
/// Holds the latest full snapshot. Dropping it unsubscribes.
pub struct InventorySubscription {
    user_id: String,
    receiver: watch::Receiver<Vec<InventoryItem>>,
}

impl InventorySubscription {
    /// The user this subscription belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The most recent snapshot, marking it as seen
    pub fn latest(&mut self) -> Vec<InventoryItem> {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a snapshot arrived since the last `latest` or `changed`
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the store has been dropped
    pub async fn changed(&mut self) -> Result<Vec<InventoryItem>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| PantryError::Storage("Inventory store closed".to_string()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Stream of snapshots, starting with the current one
    pub fn into_stream(self) -> WatchStream<Vec<InventoryItem>> {
        WatchStream::new(self.receiver)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PantryError::Validation("Item name cannot be empty".to_string()).into());
    }
    Ok(name.to_string())
}

fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .context("Failed to open database")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("Failed to set busy timeout")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;
    Ok(conn)
}

/// Start a transaction that takes the write lock up front
///
/// A deferred read-then-write transaction gets SQLITE_BUSY on the upgrade
/// without waiting for the busy timeout.
fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .context("Failed to start transaction")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)).into())
}

fn commit(tx: Transaction<'_>) -> Result<()> {
    tx.commit()
        .context("Failed to commit transaction")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)).into())
}

/// Photo URL of an item: `None` if the item is missing
fn image_of(conn: &Connection, user_id: &str, name: &str) -> Result<Option<Option<String>>> {
    conn.query_row(
        "SELECT image_url FROM inventory WHERE user_id = ?1 AND name = ?2",
        params![user_id, name],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to query item")
    .map_err(|e| PantryError::Storage(format!("{:#}", e)).into())
}

/// `previous` if it was replaced and no item references it any more
///
/// Run inside the writing transaction, after the write.
fn orphaned_photo(
    conn: &Connection,
    previous: Option<String>,
    current: Option<&str>,
) -> Result<Option<String>> {
    let Some(url) = previous.filter(|url| Some(url.as_str()) != current) else {
        return Ok(None);
    };

    let referenced: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM inventory WHERE image_url = ?1)",
            params![url],
            |row| row.get(0),
        )
        .context("Failed to check photo references")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

    Ok((!referenced).then_some(url))
}

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        name: row.get(0)?,
        quantity: row.get(1)?,
        image_url: row.get(2)?,
    })
}

fn query_items(conn: &Connection, user_id: &str) -> Result<Vec<InventoryItem>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, quantity, image_url FROM inventory
            WHERE user_id = ?1 ORDER BY name",
        )
        .context("Failed to prepare query")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

    let rows = stmt
        .query_map(params![user_id], item_from_row)
        .context("Failed to query items")
        .map_err(|e| PantryError::Storage(format!("{:#}", e)))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| PantryError::Storage(format!("{:#}", e)))?);
    }
    Ok(items)
}

fn lock_channels(
    channels: &Mutex<HashMap<String, watch::Sender<Vec<InventoryItem>>>>,
) -> MutexGuard<'_, HashMap<String, watch::Sender<Vec<InventoryItem>>>> {
    channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PantryError::Storage(format!("Storage task failed: {}", e)))?
}
