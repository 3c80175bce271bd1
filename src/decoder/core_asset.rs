use super::error::DecodeError;
use super::reader::{trim_nul_padding, ByteReader};
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;

const KEY_UNINITIALIZED: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAuthority {
    None,
    Address(SerializablePubkey),
    Collection(SerializablePubkey),
}

impl UpdateAuthority {
    pub fn pubkey(&self) -> Option<SerializablePubkey> {
        match self {
            UpdateAuthority::None => None,
            UpdateAuthority::Address(key) | UpdateAuthority::Collection(key) => Some(*key),
        }
    }
}

/// Core asset account, owned by the Core program and stored at the asset address itself.
///
/// Layout: key u8, owner 32, update authority (u8 tag, 32 bytes unless tag is 0),
/// name and uri as u32 length-prefixed strings, then an optional `Vec<u64>` sequence.
/// Plugin data may follow and is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreAsset {
    pub key: u8,
    pub owner: SerializablePubkey,
    pub update_authority: UpdateAuthority,
    pub name: String,
    pub uri: String,
    pub seq: Option<Vec<u64>>,
}

impl CoreAsset {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(data);
        let key = reader.read_u8("key")?;
        if key == KEY_UNINITIALIZED {
            return Err(DecodeError::Uninitialized { layout: "core asset" });
        }
        let owner = reader.read_pubkey("owner")?;
        let tag_offset = reader.offset();
        let update_authority = match reader.read_u8("update_authority")? {
            0 => UpdateAuthority::None,
            1 => UpdateAuthority::Address(reader.read_pubkey("update_authority")?),
            2 => UpdateAuthority::Collection(reader.read_pubkey("update_authority")?),
            value => {
                return Err(DecodeError::InvalidValue {
                    field: "update_authority",
                    offset: tag_offset,
                    value: value as u64,
                })
            }
        };
        let name = trim_nul_padding(&reader.read_string("name")?);
        let uri = trim_nul_padding(&reader.read_string("uri")?);
        // Once name and uri are decoded the asset is usable; a missing or corrupt
        // sequence does not invalidate it.
        let seq = reader
            .read_option("seq", |r| r.read_vec("seq", 8, |r| r.read_u64("seq")))
            .unwrap_or(None);

        Ok(CoreAsset {
            key,
            owner,
            update_authority,
            name,
            uri,
            seq,
        })
    }
}
