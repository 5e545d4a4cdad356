//! Binary payload storage for content records
//!

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use mediadesk_shared::error::ContentError;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// The storage key for a content record's payload.
    fn path_for(&self, id: Uuid) -> String {
        id.to_string()
    }

    async fn exists(&self, path: &str) -> Result<bool, ContentError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, ContentError>;

    /// Deleting something that isn't there is fine.
    async fn delete(&self, path: &str) -> Result<(), ContentError>;

    /// Drop every derived copy (thumbnails and the like) of the payload.
    async fn invalidate_derived_cache(&self, path: &str) -> Result<(), ContentError>;

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), ContentError>;

    async fn read_derived(&self, path: &str, variant: &str)
        -> Result<Option<Vec<u8>>, ContentError>;

    async fn write_derived(
        &self,
        path: &str,
        variant: &str,
        data: &[u8],
    ) -> Result<(), ContentError>;
}

/// Payloads live at `root/<key>`, derived copies at `cache_root/<key>/<variant>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    cache_root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache_root: cache_root.into(),
        }
    }

    /// Keys are single path components, anything else could escape the root.
    fn check_key(key: &str) -> Result<(), ContentError> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(ContentError::BlobStore(format!(
                "invalid blob key: {:?}",
                key
            ))),
        }
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, ContentError> {
        Self::check_key(key)?;
        Ok(self.root.join(key))
    }

    fn derived_dir(&self, key: &str) -> Result<PathBuf, ContentError> {
        Self::check_key(key)?;
        Ok(self.cache_root.join(key))
    }

    fn derived_path(&self, key: &str, variant: &str) -> Result<PathBuf, ContentError> {
        Self::check_key(variant)?;
        Ok(self.derived_dir(key)?.join(variant))
    }

    async fn write_file(path: &Path, data: &[u8]) -> Result<(), ContentError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|err| {
                ContentError::BlobStore(format!("failed to create {}: {}", parent.display(), err))
            })?;
        }

        let mut file = fs::File::create(path).await.map_err(|err| {
            ContentError::BlobStore(format!("failed to create {}: {}", path.display(), err))
        })?;
        file.write_all(data).await.map_err(|err| {
            ContentError::BlobStore(format!("failed to write {}: {}", path.display(), err))
        })?;
        file.flush().await.map_err(|err| {
            ContentError::BlobStore(format!("failed to flush {}: {}", path.display(), err))
        })?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, path: &str) -> Result<bool, ContentError> {
        let blob = self.blob_path(path)?;
        fs::try_exists(&blob)
            .await
            .map_err(|err| ContentError::BlobStore(format!("failed to stat {}: {}", path, err)))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, ContentError> {
        let blob = self.blob_path(path)?;
        match fs::read(&blob).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentError::NotFound(format!("No file stored for {}", path)))
            }
            Err(err) => Err(ContentError::BlobStore(format!(
                "failed to read {}: {}",
                path, err
            ))),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), ContentError> {
        let blob = self.blob_path(path)?;
        match fs::remove_file(&blob).await {
            Ok(()) => {
                debug!(path = %path, "blob deleted");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path, "blob not found for deletion");
                Ok(())
            }
            Err(err) => Err(ContentError::BlobStore(format!(
                "failed to delete {}: {}",
                path, err
            ))),
        }
    }

    async fn invalidate_derived_cache(&self, path: &str) -> Result<(), ContentError> {
        let dir = self.derived_dir(path)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(path = %path, "derived cache invalidated");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ContentError::BlobStore(format!(
                "failed to clear derived cache for {}: {}",
                path, err
            ))),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), ContentError> {
        let blob = self.blob_path(path)?;
        Self::write_file(&blob, data).await?;
        debug!(path = %path, size = data.len(), "blob written");
        Ok(())
    }

    async fn read_derived(
        &self,
        path: &str,
        variant: &str,
    ) -> Result<Option<Vec<u8>>, ContentError> {
        let derived = self.derived_path(path, variant)?;
        match fs::read(&derived).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ContentError::BlobStore(format!(
                "failed to read {}/{}: {}",
                path, variant, err
            ))),
        }
    }

    async fn write_derived(
        &self,
        path: &str,
        variant: &str,
        data: &[u8],
    ) -> Result<(), ContentError> {
        let derived = self.derived_path(path, variant)?;
        Self::write_file(&derived, data).await?;
        debug!(path = %path, variant = %variant, size = data.len(), "derived copy written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().expect("Failed to create tempdir");
        let store = LocalBlobStore::new(dir.path().join("content"), dir.path().join("cache"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, store) = store();
        let key = store.path_for(Uuid::new_v4());

        assert!(!store.exists(&key).await.expect("Failed to check"));
        store.write(&key, b"hello").await.expect("Failed to write");
        assert!(store.exists(&key).await.expect("Failed to check"));
        assert_eq!(store.read(&key).await.expect("Failed to read"), b"hello");

        store.write(&key, b"bye").await.expect("Failed to overwrite");
        assert_eq!(store.read(&key).await.expect("Failed to read"), b"bye");

        store.delete(&key).await.expect("Failed to delete");
        assert!(!store.exists(&key).await.expect("Failed to check"));
        // deleting again is fine
        store.delete(&key).await.expect("Failed to delete missing blob");

        assert!(store
            .read(&key)
            .await
            .expect_err("Should not read a deleted blob")
            .is_not_found());
    }

    #[tokio::test]
    async fn test_derived_cache() {
        let (_dir, store) = store();
        let key = store.path_for(Uuid::new_v4());

        assert!(store
            .read_derived(&key, "w100.jpg")
            .await
            .expect("Failed to read derived")
            .is_none());
        store
            .write_derived(&key, "w100.jpg", b"thumb")
            .await
            .expect("Failed to write derived");
        assert_eq!(
            store
                .read_derived(&key, "w100.jpg")
                .await
                .expect("Failed to read derived"),
            Some(b"thumb".to_vec())
        );

        store
            .invalidate_derived_cache(&key)
            .await
            .expect("Failed to invalidate");
        assert!(store
            .read_derived(&key, "w100.jpg")
            .await
            .expect("Failed to read derived")
            .is_none());
        // nothing cached is fine too
        store
            .invalidate_derived_cache(&key)
            .await
            .expect("Failed to invalidate empty cache");
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (_dir, store) = store();
        for key in ["../etc/passwd", "a/b", "/abs", "", ".."] {
            assert!(
                store.write(key, b"nope").await.is_err(),
                "key {:?} should be rejected",
                key
            );
        }
        assert!(store
            .write_derived("ok", "../escape", b"nope")
            .await
            .is_err());
    }
}
