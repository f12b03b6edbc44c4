use std::{io, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Backend that holds uploaded photo files, addressed by bare file name.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    async fn put(&self, name: &str, body: Bytes) -> io::Result<()>;
    /// Removing a file that is already gone is not an error.
    async fn remove(&self, name: &str) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    dir: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the upload directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create upload dir {}", self.dir.display()))
    }

    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing non-plain file name {:?}", name),
            ));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl PhotoStorage for LocalDiskStorage {
    async fn put(&self, name: &str, body: Bytes) -> io::Result<()> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, &body).await?;
        debug!(path = %path.display(), bytes = body.len(), "photo written");
        Ok(())
    }

    async fn remove(&self, name: &str) -> io::Result<()> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "photo removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "photo already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}
