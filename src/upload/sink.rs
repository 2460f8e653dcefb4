use std::path::PathBuf;

use async_trait::async_trait;

/// Destination for accepted uploads, keyed by assigned name
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Store `bytes` under `name`, replacing any previous file of that name
    async fn put(&self, name: &str, bytes: &[u8]) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalDiskSink {
    root: PathBuf,
}

impl LocalDiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileSink for LocalDiskSink {
    async fn put(&self, name: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
