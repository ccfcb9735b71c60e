use super::{ImageStore, StoreError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Writes uploaded images into a directory served under `/static/posts`.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    dir: PathBuf,
}

impl DiskImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        // stored paths are bare file names; anything else never came from us
        let mut components = Path::new(path).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.dir.join(name)),
            _ => Err(StoreError::Backend(format!("invalid image path {path:?}"))),
        }
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        info!("Stored image {} ({} bytes)", file_name, bytes.len());

        Ok(file_name)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let full_path = self.resolve(path)?;

        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image already gone: {}", full_path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
