//! Blob storage for item photos
//!
//! Images are keyed by `images/<file name>` and exposed under a public base
//! URL. Uploading two files with the same name overwrites the first one.

use crate::error::{PantryError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Key prefix under which all images are stored
pub const IMAGE_PREFIX: &str = "images";

/// Object store holding item photos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `images/<file name>` and return its public URL
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete the blob a public URL points at
    async fn delete(&self, url: &str) -> Result<()>;

    /// Read a blob by key, `None` if it does not exist
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Delete a blob, logging instead of failing
///
/// Photo cleanup never fails the inventory operation that triggered it.
pub async fn delete_best_effort(store: &dyn BlobStore, url: &str) {
    if let Err(e) = store.delete(url).await {
        tracing::warn!(url = %url, "Error deleting image: {:#}", e);
    }
}

/// Build the storage key for an uploaded file
///
/// Only the final path component is used, so the key always stays
/// directly under `images/`.
///
/// # Examples
///
/// ```
/// use pantrygenie::storage::blob::image_key;
///
/// assert_eq!(image_key("apple.jpg").unwrap(), "images/apple.jpg");
/// assert_eq!(image_key("/tmp/photos/apple.jpg").unwrap(), "images/apple.jpg");
/// assert!(image_key("..").is_err());
/// ```
pub fn image_key(file_name: &str) -> Result<String> {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| PantryError::Blob(format!("Invalid image file name: {:?}", file_name)))?;
    Ok(format!("{}/{}", IMAGE_PREFIX, base))
}

/// Filesystem-backed blob store
///
/// Files live under `<root>/images/`. The recipe server serves them at
/// `<public_base_url>/images/<file name>`.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Create a store rooted at `root`, creating the image directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the base URL
    /// does not parse
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        let public_base_url = public_base_url.into();

        url::Url::parse(&public_base_url).map_err(|e| {
            PantryError::Blob(format!("Invalid public base URL {}: {}", public_base_url, e))
        })?;

        std::fs::create_dir_all(root.join(IMAGE_PREFIX)).map_err(|e| {
            PantryError::Blob(format!(
                "Failed to create blob directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Public URL for a key
    pub fn url_for(&self, key: &str) -> String {
        let name = key
            .strip_prefix(IMAGE_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(key);
        format!(
            "{}/{}/{}",
            self.public_base_url,
            IMAGE_PREFIX,
            urlencoding::encode(name)
        )
    }

    /// Map a public URL back to its storage key
    ///
    /// # Errors
    ///
    /// Returns error if the URL does not point into this store
    pub fn resolve(&self, url: &str) -> Result<String> {
        let prefix = format!("{}/{}/", self.public_base_url, IMAGE_PREFIX);
        let encoded = url.strip_prefix(&prefix).ok_or_else(|| {
            PantryError::Blob(format!("URL is not managed by this store: {}", url))
        })?;

        let decoded = urlencoding::decode(encoded)
            .map_err(|e| PantryError::Blob(format!("Malformed image URL {}: {}", url, e)))?;

        image_key(&decoded)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name = key
            .strip_prefix(IMAGE_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .ok_or_else(|| PantryError::Blob(format!("Invalid image key: {}", key)))?;
        // Re-derive the key so a crafted name cannot leave the image directory
        let key = image_key(name)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let key = image_key(file_name)?;
        let path = self.path_for(&key)?;

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PantryError::Blob(format!("Failed to write {}: {}", key, e)))?;

        tracing::debug!(key = %key, size = bytes.len(), "Stored image");
        Ok(self.url_for(&key))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let key = self.resolve(url)?;
        let path = self.path_for(&key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PantryError::Blob(format!("Failed to delete {}: {}", key, e)).into()),
        }
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PantryError::Blob(format!("Failed to read {}: {}", key, e)).into()),
        }
    }
}
