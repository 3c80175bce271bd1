use cadence_macros::statsd_count;
use hyper::StatusCode;
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::media::MediaError;
use crate::metric;
use crate::store::StoreError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProxyApiError {
    #[error("Invalid token key: {0}")]
    InvalidKey(String),
    #[error("Record Not Found: {0}")]
    RecordNotFound(String),
    #[error("Upstream Error: {0}")]
    UpstreamError(String),
    #[error("Unexpected Error: {0}")]
    UnexpectedError(String),
}

impl ProxyApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyApiError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            ProxyApiError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            ProxyApiError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            ProxyApiError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the client. Internal failures are not described.
    pub fn body(&self) -> serde_json::Value {
        match self {
            ProxyApiError::UnexpectedError(_) => json!({ "error": "Internal server error" }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl From<MediaError> for ProxyApiError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::InvalidKey(key) => {
                metric! {
                    statsd_count!("invalid_key_api_error", 1);
                }
                ProxyApiError::InvalidKey(key)
            }
            MediaError::NotFound(_) | MediaError::NoMedia(_) => {
                metric! {
                    statsd_count!("record_not_found_api_error", 1);
                }
                ProxyApiError::RecordNotFound(error.to_string())
            }
            MediaError::Rpc(_)
            | MediaError::Fetch(_)
            | MediaError::InvalidImage(_)
            | MediaError::Decode(_) => {
                metric! {
                    statsd_count!("upstream_api_error", 1);
                }
                ProxyApiError::UpstreamError(error.to_string())
            }
            MediaError::Resize(_) | MediaError::CacheWrite(_) | MediaError::FileCache(_) => {
                error!("Internal server error: {}", error);
                metric! {
                    statsd_count!("unexpected_api_error", 1);
                }
                ProxyApiError::UnexpectedError(error.to_string())
            }
        }
    }
}

impl From<StoreError> for ProxyApiError {
    fn from(error: StoreError) -> Self {
        error!("Internal server database error: {}", error);
        metric! {
            statsd_count!("internal_database_api_error", 1);
        }
        ProxyApiError::UnexpectedError(error.to_string())
    }
}
