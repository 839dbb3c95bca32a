use std::path::PathBuf;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

/// Permanent home for processed avatar files. Implementations return the
/// public path the file is reachable under.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn store(&self, filename: &str, body: Bytes) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct LocalAvatarStore {
    root: PathBuf,
}

impl LocalAvatarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AvatarStore for LocalAvatarStore {
    async fn store(&self, filename: &str, body: Bytes) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("create avatars dir")?;

        let path = self.root.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write avatar {}", path.display()))?;

        Ok(format!("/avatars/{}", filename))
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    #[tokio::test]
    async fn store_writes_file_and_returns_public_path() {
        let root = std::env::temp_dir().join("userhub-avatar-store-test");
        let store = LocalAvatarStore::new(&root);

        let url = store
            .store("abc.png", Bytes::from_static(b"fake-image-bytes"))
            .await
            .expect("store should succeed");

        assert_eq!(url, "/avatars/abc.png");
        let written = tokio::fs::read(root.join("abc.png")).await.unwrap();
        assert_eq!(written, b"fake-image-bytes");

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
