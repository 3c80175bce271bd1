use thiserror::Error;

use crate::decoder::DecodeError;
use crate::resolver::ResolveError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid token key: {0}")]
    InvalidKey(String),
    #[error("Metadata not found for {0}")]
    NotFound(String),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("No media for mint {0}")]
    NoMedia(String),
    #[error("Resize error: {0}")]
    Resize(String),
    #[error("Cache write error: {0}")]
    CacheWrite(#[from] StoreError),
    #[error("File cache error: {0}")]
    FileCache(#[from] std::io::Error),
}

impl From<ResolveError> for MediaError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::InvalidKey(key) => MediaError::InvalidKey(key),
            ResolveError::NotFound(mint) | ResolveError::NoCreators(mint) => {
                MediaError::NotFound(mint)
            }
            ResolveError::UnsupportedProtocol { mint, .. } => MediaError::NotFound(mint),
            ResolveError::Rpc(message) => MediaError::Rpc(message),
            ResolveError::Decode(e) => MediaError::Decode(e),
        }
    }
}

impl From<image::ImageError> for MediaError {
    fn from(error: image::ImageError) -> Self {
        MediaError::Resize(error.to_string())
    }
}

impl From<gif::DecodingError> for MediaError {
    fn from(error: gif::DecodingError) -> Self {
        MediaError::Resize(format!("gif decode: {}", error))
    }
}

impl From<gif::EncodingError> for MediaError {
    fn from(error: gif::EncodingError) -> Self {
        MediaError::Resize(format!("gif encode: {}", error))
    }
}
