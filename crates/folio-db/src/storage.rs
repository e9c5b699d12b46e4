//! Blob storage backends for uploaded images.
//!
//! The API layer hands a derived key and the decoded bytes to a
//! [`BlobStore`]; the store answers with the publicly resolvable URL the
//! client embeds in note content. The default backend is the local
//! filesystem with atomic writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use folio_core::{Error, Result};

/// Abstraction over blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store data under the key, returning the public URL for the blob.
    async fn put(&self, key: &str, data: &[u8]) -> Result<String>;

    /// Read the blob stored under the key.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete the blob stored under the key. Deleting a missing blob is
    /// not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a blob exists under the key.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Reject keys that could escape the storage root.
///
/// Keys are slash-separated segments; empty segments, `.`/`..`, and
/// backslash or NUL bytes are refused.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('\\') || key.contains('\0') {
        return Err(Error::InvalidInput("Invalid storage key".to_string()));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::InvalidInput("Invalid storage key".to_string()));
        }
    }
    Ok(())
}

/// Filesystem blob store.
///
/// Blobs live under `{base_path}/{key}`; writes go through a temp file
/// and rename so readers never observe partial content.
pub struct FilesystemStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemStore {
    /// Create a new filesystem store rooted at `base_path`, issuing URLs
    /// under `{public_base_url}/files/`.
    pub fn new(base_path: impl AsRef<Path>, public_base_url: &str) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/files/{}", self.public_base_url, key)
    }

    /// Startup self-check: round-trip a probe blob through the store.
    pub async fn validate(&self) -> Result<()> {
        let key = ".folio-storage-probe";
        let payload = format!("probe {}", chrono::Utc::now().timestamp_millis());

        self.put(key, payload.as_bytes()).await?;
        let read_back = self.get(key).await?;
        self.delete(key).await?;

        if read_back != payload.as_bytes() {
            return Err(Error::Storage(
                "storage probe read back different content".to_string(),
            ));
        }

        info!(
            subsystem = "storage",
            component = "blob_store",
            base_path = %self.base_path.display(),
            "Filesystem store validated"
        );
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        validate_key(key)?;
        let full_path = self.full_path(key);
        debug!(
            subsystem = "storage",
            component = "blob_store",
            storage_key = %key,
            bytes = data.len(),
            "blob_store: put"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "blob_store: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "blob_store: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "blob_store: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "blob_store: rename failed");
            e
        })?;

        // 0644: rw-r--r--, no execute
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(self.public_url(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let full_path = self.full_path(key);
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Blob {} not found", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let full_path = self.full_path(key);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(fs::try_exists(self.full_path(key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_derived_keys() {
        assert!(validate_key("0193-a/images/1724371200000-abc123.png").is_ok());
        assert!(validate_key(".folio-storage-probe").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("a\\b").is_err());
    }

    #[test]
    fn test_public_url_shape() {
        let store = FilesystemStore::new("/tmp/folio", "http://localhost:3000/");
        assert_eq!(
            store.public_url("u/images/1-a.png"),
            "http://localhost:3000/files/u/images/1-a.png"
        );
    }
}
