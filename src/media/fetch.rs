use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};

use super::error::MediaError;

pub const BASE64_MARKER: &str = ";base64,";
const DATA_SCHEME: &str = "data:";
const IPFS_SCHEME: &str = "ipfs://";
const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";
const LEGACY_NFT_STORAGE_HOST: &str = ".ipfs.nftstorage.link";
const NFT_STORAGE_HOST: &str = ".ipfs.w3s.link";
const FETCH_USER_AGENT: &str = "PostmanRuntime/7.29.2";
/// Largest response body buffered for a single document or media file.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP GET seam for off-chain documents and media.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedBytes, MediaError>;
}

pub struct ReqwestFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl ReqwestFetcher {
    pub fn new(client: Client) -> Self {
        Self::with_max_body_bytes(client, MAX_BODY_BYTES)
    }

    pub fn with_max_body_bytes(client: Client, max_body_bytes: usize) -> Self {
        ReqwestFetcher {
            client,
            max_body_bytes,
        }
    }

    fn too_large(&self, url: &str) -> MediaError {
        MediaError::Fetch(format!("Body of {} exceeds {} bytes", url, self.max_body_bytes))
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedBytes, MediaError> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, FETCH_USER_AGENT)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| MediaError::Fetch(format!("Error requesting {}: {}", url, e)))?;

        if response.status() != StatusCode::OK {
            return Err(MediaError::Fetch(format!(
                "Unexpected status {} from {}",
                response.status(),
                url
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MediaError::Fetch(format!("Error reading body of {}: {}", url, e)))?
        {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedBytes {
            bytes,
            content_type,
        })
    }
}

/// Where the bytes behind a metadata or image uri live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriSource {
    /// Payload carried inline in a `data:` uri.
    Inline {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    Remote(String),
}

/// Strips NUL padding and whitespace, then maps gateway specific forms onto fetchable urls.
pub fn normalize_remote_uri(uri: &str) -> String {
    let uri = uri.trim_matches(char::from(0)).trim();
    let uri = match uri.strip_prefix(IPFS_SCHEME) {
        Some(path) => format!("{}{}", IPFS_GATEWAY, path.trim_start_matches("ipfs/")),
        None => uri.to_string(),
    };
    uri.replacen(LEGACY_NFT_STORAGE_HOST, NFT_STORAGE_HOST, 1)
}

fn data_uri_content_type(header: &str) -> Option<String> {
    let mime = header.strip_prefix(DATA_SCHEME)?.split(';').next()?;
    if mime.is_empty() {
        None
    } else {
        Some(mime.to_string())
    }
}

pub fn classify_uri(uri: &str) -> Result<UriSource, MediaError> {
    let trimmed = uri.trim_matches(char::from(0)).trim();
    if let Some(index) = trimmed.find(BASE64_MARKER) {
        let payload = &trimmed[index + BASE64_MARKER.len()..];
        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| MediaError::Fetch(format!("Invalid base64 data uri: {}", e)))?;
        return Ok(UriSource::Inline {
            bytes,
            content_type: data_uri_content_type(&trimmed[..index]),
        });
    }
    if trimmed.starts_with(DATA_SCHEME) {
        let Some((header, payload)) = trimmed.split_once(',') else {
            return Err(MediaError::Fetch("Malformed data uri".to_string()));
        };
        return Ok(UriSource::Inline {
            bytes: payload.as_bytes().to_vec(),
            content_type: data_uri_content_type(header),
        });
    }
    if trimmed.is_empty() {
        return Err(MediaError::Fetch("Empty uri".to_string()));
    }
    Ok(UriSource::Remote(normalize_remote_uri(trimmed)))
}

/// Resolves `uri` to bytes, decoding inline data or fetching over HTTP. An empty payload
/// counts as a failed fetch.
pub async fn fetch_uri(
    fetcher: &dyn HttpFetcher,
    uri: &str,
    timeout: Duration,
) -> Result<FetchedBytes, MediaError> {
    let fetched = match classify_uri(uri)? {
        UriSource::Inline {
            bytes,
            content_type,
        } => FetchedBytes {
            bytes,
            content_type,
        },
        UriSource::Remote(url) => {
            debug!("Fetching {}", url);
            fetcher.get(&url, timeout).await?
        }
    };
    if fetched.bytes.is_empty() {
        return Err(MediaError::Fetch(format!("Empty response for {}", uri)));
    }
    Ok(fetched)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Serves canned responses and counts requests.
    #[derive(Default)]
    pub struct MockHttpFetcher {
        pub responses: Mutex<HashMap<String, FetchedBytes>>,
        pub calls: AtomicUsize,
    }

    impl MockHttpFetcher {
        pub fn with_response(self, url: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
            self.responses.lock().unwrap().insert(
                url.to_string(),
                FetchedBytes {
                    bytes,
                    content_type: content_type.map(|c| c.to_string()),
                },
            );
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpFetcher for MockHttpFetcher {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<FetchedBytes, MediaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| MediaError::Fetch(format!("Unexpected status 404 from {}", url)))
        }
    }
}
