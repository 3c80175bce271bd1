use log::error;
use serde::{Deserialize, Deserializer};

pub const SUPPORTED_IMAGE_TYPES: [&str; 5] = ["png", "jpg", "jpeg", "gif", "svg"];
pub const FALLBACK_IMAGE_TYPE: &str = "jpg";

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OffchainFile {
    #[serde(alias = "uri", deserialize_with = "nullable")]
    pub url: String,
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub file_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OffchainCreator {
    #[serde(deserialize_with = "nullable")]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OffchainProperties {
    pub category: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub creators: Vec<OffchainCreator>,
    #[serde(deserialize_with = "nullable")]
    pub files: Vec<OffchainFile>,
}

/// The JSON document a token's metadata uri points at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OffchainMetadataDoc {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub symbol: String,
    #[serde(deserialize_with = "nullable")]
    pub image: String,
    #[serde(alias = "animationUrl")]
    pub animation_url: Option<String>,
    #[serde(alias = "externalUrl")]
    pub external_url: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub properties: OffchainProperties,
    #[serde(deserialize_with = "nullable")]
    pub files: Vec<OffchainFile>,
}

impl OffchainMetadataDoc {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Top-level files first, then `properties.files`.
    pub fn files(&self) -> impl Iterator<Item = &OffchainFile> {
        self.files.iter().chain(self.properties.files.iter())
    }

    pub fn image_file(&self) -> Option<&OffchainFile> {
        self.files().find(|file| file.url == self.image)
    }

    /// First file that is not the primary image and is either not an image or a gif.
    pub fn animation_file(&self) -> Option<&OffchainFile> {
        self.files().find(|file| {
            let still_image =
                file.file_type.contains("image") && !file.file_type.contains("gif");
            file.url != self.image && !still_image
        })
    }

    pub fn creator_addresses(&self) -> Vec<String> {
        self.properties
            .creators
            .iter()
            .filter(|creator| !creator.address.is_empty())
            .map(|creator| creator.address.clone())
            .collect()
    }

    /// Image type from the matching file entry, else from the image url.
    pub fn guess_image_type(&self) -> String {
        let guessed = self
            .image_file()
            .and_then(|file| mime_subtype(&file.file_type))
            .or_else(|| data_uri_subtype(&self.image))
            .unwrap_or_else(|| image_type_from_url(&self.image));
        normalize_image_type(&guessed)
    }
}

/// `image/svg+xml` -> `svg`, `video/mp4; codecs=avc1` -> `mp4`.
pub fn mime_subtype(mime: &str) -> Option<String> {
    let (_, subtype) = mime.split_once('/')?;
    let subtype = subtype.split(';').next().unwrap_or_default().trim();
    let subtype = subtype.strip_suffix("+xml").unwrap_or(subtype);
    if subtype.is_empty() {
        None
    } else {
        Some(subtype.to_lowercase())
    }
}

/// `data:image/png;base64,...` -> `png`.
fn data_uri_subtype(uri: &str) -> Option<String> {
    let header = uri.trim().strip_prefix("data:")?;
    let mime = header.split(|c| c == ';' || c == ',').next()?;
    mime_subtype(mime)
}

pub fn image_type_from_url(url: &str) -> String {
    let last = url.rsplit('.').next().unwrap_or_default();
    let guessed = if let Some((_, value)) = last.rsplit_once('=') {
        value
    } else if let Some((before, _)) = last.split_once('?') {
        before
    } else {
        last
    };
    guessed.trim().to_lowercase()
}

pub fn normalize_image_type(image_type: &str) -> String {
    if SUPPORTED_IMAGE_TYPES.contains(&image_type) {
        image_type.to_string()
    } else {
        error!("Invalid image type guessed: {}", image_type);
        FALLBACK_IMAGE_TYPE.to_string()
    }
}
