use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Byte store for resized images, keyed by mint and image type.
#[async_trait]
pub trait FileCache: Send + Sync {
    fn path_for(&self, mint: &str, image_type: &str) -> PathBuf;

    /// A cached file only counts when it exists and is non-empty.
    async fn exists(&self, mint: &str, image_type: &str) -> std::io::Result<bool>;

    async fn write(&self, mint: &str, image_type: &str, bytes: &[u8]) -> std::io::Result<PathBuf>;

    async fn read(&self, mint: &str, image_type: &str) -> std::io::Result<Vec<u8>>;
}

/// Files laid out as `<root>/<chain>/<mint>.<ext>`.
pub struct DiskFileCache {
    root: PathBuf,
}

impl DiskFileCache {
    pub fn new(root: impl AsRef<Path>, chain: &str) -> Self {
        DiskFileCache {
            root: root.as_ref().join(chain),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileCache for DiskFileCache {
    fn path_for(&self, mint: &str, image_type: &str) -> PathBuf {
        self.root.join(format!("{}.{}", mint, image_type))
    }

    async fn exists(&self, mint: &str, image_type: &str) -> std::io::Result<bool> {
        match tokio::fs::metadata(self.path_for(mint, image_type)).await {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Writes to a temporary sibling and renames it into place, so readers never see a
    /// partially written file.
    async fn write(&self, mint: &str, image_type: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(mint, image_type);
        let tmp = self
            .root
            .join(format!(".{}.{}.{}.tmp", mint, image_type, rand::random::<u32>()));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(path)
    }

    async fn read(&self, mint: &str, image_type: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path_for(mint, image_type)).await
    }
}
