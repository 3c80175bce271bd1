pub mod config;
pub mod error;
pub mod fetch;
pub mod file_cache;
pub mod offchain;
pub mod resize;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::common::typedefs::unix_timestamp::UnixTimestamp;
use crate::dao::generated::media;
use crate::decoder::NormalizedMetadata;
use crate::resolver::{parse_mint, MetadataResolver};
use crate::store::MediaStore;

pub use config::{MediaConfig, RefreshPolicy};
pub use error::MediaError;
pub use fetch::{FetchedBytes, HttpFetcher, ReqwestFetcher};
pub use file_cache::{DiskFileCache, FileCache};
pub use offchain::OffchainMetadataDoc;
pub use resize::Resizer;
pub use types::{image_content_type, MediaPayload, MediaRecord};

/// Resolves mints to cached media rows and resized image files.
///
/// Metadata rows and image files are written independently: a row may exist without its
/// file, in which case the next image request fetches and resizes it again.
pub struct MediaService {
    resolver: Arc<MetadataResolver>,
    store: Arc<dyn MediaStore>,
    files: Arc<dyn FileCache>,
    http: Arc<dyn HttpFetcher>,
    resizer: Resizer,
    config: MediaConfig,
}

impl MediaService {
    pub fn new(
        resolver: Arc<MetadataResolver>,
        store: Arc<dyn MediaStore>,
        files: Arc<dyn FileCache>,
        http: Arc<dyn HttpFetcher>,
        config: MediaConfig,
    ) -> Self {
        MediaService {
            resolver,
            store,
            files,
            http,
            resizer: Resizer::new(config.target_height),
            config,
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    /// Cached row for `key`, resolving and caching it on a miss or when forced.
    pub async fn media(&self, key: &str, force_refresh: bool) -> Result<MediaRecord, MediaError> {
        self.media_row(key, force_refresh).await.map(MediaRecord::from)
    }

    /// Like [`media`](Self::media), applying the refresh policy to cached rows. A refreshed
    /// row also has its image refetched. Exempt mints are always served from cache.
    pub async fn request_media(
        &self,
        key: &str,
        skip_cache: bool,
    ) -> Result<MediaRecord, MediaError> {
        parse_mint(key)?;
        let cached = self.store.find(key).await?;
        let row = match cached {
            Some(row) if self.config.is_exempt(key) => row,
            Some(row)
                if !skip_cache && !self.config.refresh_policy.should_refresh(row.created_at) =>
            {
                row
            }
            Some(row) => {
                debug!("Refreshing cached media for {}", key);
                match self.fetch_metadata(key).await {
                    Ok(refreshed) => {
                        if let Err(e) = self.fetch_image(&refreshed).await {
                            warn!("Failed to refresh image for {}: {}", key, e);
                        }
                        refreshed
                    }
                    Err(e) => {
                        warn!("Failed to refresh media for {}, serving cached row: {}", key, e);
                        row
                    }
                }
            }
            None => self.fetch_metadata(key).await?,
        };
        Ok(row.into())
    }

    async fn media_row(&self, key: &str, force_refresh: bool) -> Result<media::Model, MediaError> {
        parse_mint(key)?;
        if !force_refresh {
            if let Some(row) = self.store.find(key).await? {
                return Ok(row);
            }
        }
        self.fetch_metadata(key).await
    }

    /// Resolves on-chain metadata, fetches the off-chain document and upserts the row.
    ///
    /// When the document cannot be fetched and no row is cached yet, a row is written from
    /// on-chain data alone (with no image) and the fetch error is returned. An existing row
    /// is never replaced by an on-chain-only one.
    pub async fn fetch_metadata(&self, key: &str) -> Result<media::Model, MediaError> {
        let metadata = self.resolver.resolve(key).await?;
        match self.fetch_document(&metadata.uri).await {
            Ok(doc) => {
                let row = self.build_row(key, &metadata, Some(&doc));
                self.store.upsert(row.clone()).await?;
                Ok(row)
            }
            Err(e) => {
                warn!("Failed to fetch off-chain metadata for {}: {}", key, e);
                if self.store.find(key).await?.is_none() {
                    self.store.upsert(self.build_row(key, &metadata, None)).await?;
                }
                Err(e)
            }
        }
    }

    async fn fetch_document(&self, uri: &str) -> Result<OffchainMetadataDoc, MediaError> {
        let fetched =
            fetch::fetch_uri(self.http.as_ref(), uri, self.config.metadata_timeout).await?;
        OffchainMetadataDoc::parse(&fetched.bytes)
            .map_err(|e| MediaError::Fetch(format!("Invalid metadata document at {}: {}", uri, e)))
    }

    fn build_row(
        &self,
        key: &str,
        metadata: &NormalizedMetadata,
        doc: Option<&OffchainMetadataDoc>,
    ) -> media::Model {
        let image_type = doc
            .map(|doc| doc.guess_image_type())
            .unwrap_or_else(|| offchain::FALLBACK_IMAGE_TYPE.to_string());
        let animation = doc.and_then(|doc| doc.animation_file());
        let prefer_onchain = |onchain: &str, offchain: Option<&String>| {
            if onchain.is_empty() {
                offchain.cloned().unwrap_or_default()
            } else {
                onchain.to_string()
            }
        };

        media::Model {
            mint: key.to_string(),
            decimals: metadata.mint_decimals as i16,
            image_uri: doc.map(|doc| doc.image.trim().to_string()).unwrap_or_default(),
            local_path: self
                .files
                .path_for(key, &image_type)
                .to_string_lossy()
                .into_owned(),
            image_type,
            media_uri: animation.map(|file| file.url.clone()),
            media_type: animation.and_then(|file| offchain::mime_subtype(&file.file_type)),
            name: prefer_onchain(&metadata.name, doc.map(|doc| &doc.name)),
            symbol: prefer_onchain(&metadata.symbol, doc.map(|doc| &doc.symbol)),
            update_authority: metadata.update_authority.map(|key| key.to_string()),
            created_at: UnixTimestamp::now().into(),
        }
    }

    /// Resized image for `key`, fetched and written to the file cache on a miss.
    pub async fn image_file(&self, key: &str) -> Result<MediaPayload, MediaError> {
        let row = self.media_row(key, false).await?;
        if !self.files.exists(&row.mint, &row.image_type).await? {
            self.fetch_image(&row).await?;
        }
        let bytes = self.files.read(&row.mint, &row.image_type).await?;
        Ok(MediaPayload {
            bytes,
            content_type: image_content_type(&row.image_type),
        })
    }

    /// Ensures the image file for `key` is cached and returns its path.
    pub async fn warm(&self, key: &str, force_refresh: bool) -> Result<PathBuf, MediaError> {
        let row = self.media_row(key, force_refresh).await?;
        if force_refresh || !self.files.exists(&row.mint, &row.image_type).await? {
            return self.fetch_image(&row).await;
        }
        Ok(self.files.path_for(&row.mint, &row.image_type))
    }

    /// Refetches the image for `key`. Exempt mints are left untouched.
    pub async fn clear_cache(&self, key: &str) -> Result<(), MediaError> {
        let row = self.media_row(key, false).await?;
        if self.config.is_exempt(key) {
            return Ok(());
        }
        self.fetch_image(&row).await.map(|_| ())
    }

    async fn fetch_image(&self, row: &media::Model) -> Result<PathBuf, MediaError> {
        if row.image_uri.is_empty() {
            return Err(MediaError::InvalidImage(format!("No image for {}", row.mint)));
        }
        info!("Fetching image for {}", row.mint);
        let fetched =
            fetch::fetch_uri(self.http.as_ref(), &row.image_uri, self.config.media_timeout)
                .await?;
        let resizer = self.resizer;
        let resized = tokio::task::spawn_blocking(move || resizer.resize(&fetched.bytes))
            .await
            .map_err(|e| MediaError::Resize(format!("Resize task failed: {}", e)))??;
        Ok(self.files.write(&row.mint, &row.image_type, &resized).await?)
    }

    /// Proxies the animation file for `key` without caching it locally.
    pub async fn media_file(&self, key: &str) -> Result<MediaPayload, MediaError> {
        let row = self.media_row(key, false).await?;
        let media_uri = row
            .media_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| MediaError::NoMedia(row.mint.clone()))?;
        let fetched =
            fetch::fetch_uri(self.http.as_ref(), media_uri, self.config.media_timeout).await?;
        let content_type = fetched
            .content_type
            .filter(|content_type| !content_type.is_empty())
            .unwrap_or_else(|| media_content_type(row.media_type.as_deref()));
        Ok(MediaPayload {
            bytes: fetched.bytes,
            content_type,
        })
    }
}

pub fn media_content_type(media_type: Option<&str>) -> String {
    match media_type {
        Some(mime) if mime.contains('/') => mime.to_string(),
        Some(video @ ("mp4" | "webm" | "quicktime")) => format!("video/{}", video),
        Some("mov") => "video/quicktime".to_string(),
        Some("mp3") | Some("mpeg") => "audio/mpeg".to_string(),
        Some("wav") => "audio/wav".to_string(),
        Some("glb") | Some("gltf-binary") => "model/gltf-binary".to_string(),
        Some("html") => "text/html".to_string(),
        Some(other) if offchain::SUPPORTED_IMAGE_TYPES.contains(&other) => {
            image_content_type(other)
        }
        _ => "application/octet-stream".to_string(),
    }
}
