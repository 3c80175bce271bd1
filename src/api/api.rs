use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE, VARY};
use hyper::{Body, Response, StatusCode};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use log::{debug, warn};
use serde::Serialize;
use serde_json::json;

use super::error::ProxyApiError;
use crate::media::{MediaError, MediaPayload, MediaService};
use crate::stats::{Stats, StatsSnapshot};

pub const METADATA_CACHE_CONTROL: &str = "public, max-age=172800";
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=172800";
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=31536000";
pub const PLACEHOLDER_CACHE_CONTROL: &str = "public, max-age=60";

const PLACEHOLDER_SIZE: u32 = 256;
const PLACEHOLDER_GREY: u8 = 0xcc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub images_stored: u64,
    #[serde(flatten)]
    pub counters: StatsSnapshot,
}

/// Request handlers backing the HTTP routes.
pub struct ProxyApi {
    media: Arc<MediaService>,
    stats: Arc<Stats>,
    placeholder: Arc<Vec<u8>>,
}

impl ProxyApi {
    pub fn new(media: Arc<MediaService>, stats: Arc<Stats>, placeholder: Vec<u8>) -> Self {
        ProxyApi {
            media,
            stats,
            placeholder: Arc::new(placeholder),
        }
    }

    pub fn ping(&self) -> Response<Body> {
        json_response(StatusCode::OK, &json!({ "message": "pong" }))
    }

    pub async fn stats(&self) -> Result<StatsResponse, ProxyApiError> {
        let images_stored = self.media.store().count().await?;
        Ok(StatsResponse {
            images_stored,
            counters: self.stats.snapshot(),
        })
    }

    pub async fn stats_response(&self) -> Response<Body> {
        match self.stats().await {
            Ok(stats) => json_response(StatusCode::OK, &stats),
            Err(e) => error_response(&e),
        }
    }

    pub async fn token_metadata(&self, id: &str, nocache: bool) -> Response<Body> {
        self.stats.increment_requests();
        match self.media.request_media(id, nocache).await {
            Ok(record) => {
                let mut response = json_response(StatusCode::OK, &record);
                set_header(&mut response, CACHE_CONTROL, METADATA_CACHE_CONTROL);
                response
            }
            Err(e) => error_response(&ProxyApiError::from(e)),
        }
    }

    pub async fn token_image(&self, id: &str) -> Response<Body> {
        self.stats.increment_image_files();
        let result = self.media.image_file(id).await;
        self.payload_or_placeholder(id, result, IMAGE_CACHE_CONTROL)
    }

    pub async fn token_media(&self, id: &str) -> Response<Body> {
        self.stats.increment_media_files();
        let result = self.media.media_file(id).await;
        self.payload_or_placeholder(id, result, MEDIA_CACHE_CONTROL)
    }

    fn payload_or_placeholder(
        &self,
        id: &str,
        result: Result<MediaPayload, MediaError>,
        cache_control: &'static str,
    ) -> Response<Body> {
        match result {
            Ok(payload) => {
                let mut response = bytes_response(payload.bytes, &payload.content_type);
                set_header(&mut response, CACHE_CONTROL, cache_control);
                set_header(&mut response, VARY, "Accept-Encoding");
                response
            }
            Err(MediaError::InvalidKey(key)) => {
                error_response(&ProxyApiError::from(MediaError::InvalidKey(key)))
            }
            Err(e) => {
                warn!("Serving placeholder for {}: {}", id, e);
                self.placeholder()
            }
        }
    }

    pub fn placeholder(&self) -> Response<Body> {
        let mut response = bytes_response(self.placeholder.as_ref().clone(), "image/jpeg");
        set_header(&mut response, CACHE_CONTROL, PLACEHOLDER_CACHE_CONTROL);
        response
    }

    pub fn not_found(&self) -> Response<Body> {
        json_response(
            StatusCode::NOT_FOUND,
            &json!({ "code": "PAGE_NOT_FOUND", "message": "Page not found" }),
        )
    }
}

/// Reads the placeholder image from `path`, or renders a plain grey JPEG.
pub fn load_placeholder(path: Option<&Path>) -> Result<Vec<u8>, MediaError> {
    if let Some(path) = path {
        debug!("Loading placeholder image from {:?}", path);
        return Ok(std::fs::read(path)?);
    }
    let image = RgbImage::from_pixel(
        PLACEHOLDER_SIZE,
        PLACEHOLDER_SIZE,
        Rgb([PLACEHOLDER_GREY, PLACEHOLDER_GREY, PLACEHOLDER_GREY]),
    );
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut out, ImageOutputFormat::Jpeg(90))?;
    Ok(out.into_inner())
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let body = match serde_json::to_vec(body) {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            return plain_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    set_header(&mut response, CONTENT_TYPE, "application/json");
    response
}

fn bytes_response(bytes: Vec<u8>, content_type: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(bytes));
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

pub(crate) fn error_response(error: &ProxyApiError) -> Response<Body> {
    json_response(error.status(), &error.body())
}

fn plain_status(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn set_header(response: &mut Response<Body>, name: hyper::header::HeaderName, value: &'static str) {
    response
        .headers_mut()
        .insert(name, HeaderValue::from_static(value));
}
