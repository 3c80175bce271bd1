pub mod core_asset;
pub mod error;
pub mod extensions;
pub mod legacy;
pub mod mint;
pub mod normalized;
pub mod reader;

pub use error::DecodeError;
pub use normalized::{NormalizedMetadata, Protocol};
