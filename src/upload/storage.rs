use std::path::Path;
use async_trait::async_trait;
use super::traits::LocalStorage;

/// `LocalStorage` backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioStorage;

#[async_trait]
impl LocalStorage for TokioStorage {
    async fn exists(&self, path: &Path) -> bool {
        matches!(tokio::fs::metadata(path).await, Ok(metadata) if metadata.is_file())
    }

    async fn remove(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "remove file failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exists_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        tokio::fs::write(&path, b"frames").await.unwrap();

        let storage = TokioStorage;
        assert!(storage.exists(&path).await);
        assert!(!storage.exists(dir.path()).await);

        assert!(storage.remove(&path).await);
        assert!(!storage.exists(&path).await);
        // Second delete is swallowed
        assert!(!storage.remove(&path).await);
    }
}
