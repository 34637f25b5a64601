use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

/// Where processors park generated files. Returns a locator for the
/// stored content that ends up in the job result.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> io::Result<String>;
}

/// Filesystem-backed store rooted at a single directory.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(key);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Stored content");
        Ok(path.display().to_string())
    }
}
