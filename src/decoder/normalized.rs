use serde::Serialize;

use super::core_asset::CoreAsset;
use super::error::DecodeError;
use super::extensions::TokenMetadata;
use super::legacy::LegacyMetadata;
use super::reader::trim_nul_padding;
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Protocol {
    Legacy,
    Token22Embedded,
    Core,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Legacy => "legacy",
            Protocol::Token22Embedded => "token22",
            Protocol::Core => "core",
        }
    }
}

/// Protocol independent view of a token's on-chain metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetadata {
    pub protocol: Protocol,
    pub mint_decimals: u8,
    pub update_authority: Option<SerializablePubkey>,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub creators: Option<Vec<SerializablePubkey>>,
}

impl NormalizedMetadata {
    pub fn from_legacy(data: &[u8], mint_decimals: u8) -> Result<Self, DecodeError> {
        let metadata = LegacyMetadata::decode(data)?;
        Ok(NormalizedMetadata {
            protocol: Protocol::Legacy,
            mint_decimals,
            update_authority: Some(metadata.update_authority),
            name: metadata.name,
            symbol: metadata.symbol,
            uri: metadata.uri,
            creators: metadata
                .creators
                .map(|creators| creators.into_iter().map(|c| c.address).collect()),
        })
    }

    /// Core assets carry no decimals and no symbol.
    pub fn from_core(data: &[u8]) -> Result<Self, DecodeError> {
        let asset = CoreAsset::decode(data)?;
        Ok(NormalizedMetadata {
            protocol: Protocol::Core,
            mint_decimals: 0,
            update_authority: asset.update_authority.pubkey(),
            name: asset.name,
            symbol: String::new(),
            uri: asset.uri,
            creators: None,
        })
    }

    pub fn from_token_metadata(metadata: &TokenMetadata, mint_decimals: u8) -> Self {
        NormalizedMetadata {
            protocol: Protocol::Token22Embedded,
            mint_decimals,
            update_authority: metadata.update_authority,
            name: trim_nul_padding(&metadata.name),
            symbol: trim_nul_padding(&metadata.symbol),
            uri: trim_nul_padding(&metadata.uri),
            creators: None,
        }
    }
}
