use thiserror::Error;

use crate::decoder::DecodeError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid token key: {0}")]
    InvalidKey(String),
    #[error("Metadata not found for {0}")]
    NotFound(String),
    #[error("No decodable metadata for {mint} under {protocol}")]
    UnsupportedProtocol { mint: String, protocol: &'static str },
    #[error("Unable to find creators for {0}")]
    NoCreators(String),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}
