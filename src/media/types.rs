use serde::Serialize;

use crate::dao::generated::media;

/// Public view of a cached media row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub mint: String,
    pub decimals: u8,
    pub image_uri: String,
    pub image_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_authority: Option<String>,
}

impl From<media::Model> for MediaRecord {
    fn from(model: media::Model) -> Self {
        MediaRecord {
            mint: model.mint,
            decimals: model.decimals.clamp(0, u8::MAX as i16) as u8,
            image_uri: model.image_uri,
            image_type: model.image_type,
            media_uri: model.media_uri,
            media_type: model.media_type,
            name: model.name,
            symbol: model.symbol,
            update_authority: model.update_authority,
        }
    }
}

/// Bytes ready to be written to an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub fn image_content_type(image_type: &str) -> String {
    match image_type {
        "svg" => "image/svg+xml".to_string(),
        "jpg" => "image/jpeg".to_string(),
        other => format!("image/{}", other),
    }
}
