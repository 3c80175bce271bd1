use super::error::DecodeError;
use super::reader::ByteReader;
use crate::common::token_layout::{MINT_BASE_LEN, SPL_TOKEN_ACCOUNT_BASE_LEN};
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;

/// Fixed SPL mint header shared by the legacy token program and Token-2022.
///
/// Layout (82 bytes):
/// - mint_authority COption (4 + 32 bytes)
/// - supply (8 bytes)
/// - decimals (1 byte)
/// - is_initialized (1 byte)
/// - freeze_authority COption (4 + 32 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MintHeader {
    pub mint_authority: Option<SerializablePubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<SerializablePubkey>,
}

fn read_coption_pubkey(
    reader: &mut ByteReader,
    field: &'static str,
) -> Result<Option<SerializablePubkey>, DecodeError> {
    let offset = reader.offset();
    let tag = reader.read_u32(field)?;
    let key = reader.read_pubkey(field)?;
    match tag {
        0 => Ok(None),
        1 => Ok(Some(key)),
        value => Err(DecodeError::InvalidValue {
            field,
            offset,
            value: value as u64,
        }),
    }
}

fn write_coption_pubkey(out: &mut Vec<u8>, key: Option<&SerializablePubkey>) {
    match key {
        Some(key) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&key.0.to_bytes());
        }
        None => {
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 32]);
        }
    }
}

impl MintHeader {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MINT_BASE_LEN {
            return Err(DecodeError::UnexpectedEof {
                field: "mint",
                offset: 0,
                needed: MINT_BASE_LEN,
                remaining: data.len(),
            });
        }
        let mut reader = ByteReader::new(data);
        let mint_authority = read_coption_pubkey(&mut reader, "mint_authority")?;
        let supply = reader.read_u64("supply")?;
        let decimals = reader.read_u8("decimals")?;
        let is_initialized = reader.read_bool("is_initialized")?;
        let freeze_authority = read_coption_pubkey(&mut reader, "freeze_authority")?;
        Ok(MintHeader {
            mint_authority,
            supply,
            decimals,
            is_initialized,
            freeze_authority,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MINT_BASE_LEN);
        write_coption_pubkey(&mut out, self.mint_authority.as_ref());
        out.extend_from_slice(&self.supply.to_le_bytes());
        out.push(self.decimals);
        out.push(self.is_initialized as u8);
        write_coption_pubkey(&mut out, self.freeze_authority.as_ref());
        out
    }
}

/// Returns the extension region of an extended mint (account type marker onwards), or `None`
/// for accounts that stop at the base layout.
pub fn extension_region(data: &[u8]) -> Option<&[u8]> {
    if data.len() <= SPL_TOKEN_ACCOUNT_BASE_LEN {
        return None;
    }
    Some(&data[SPL_TOKEN_ACCOUNT_BASE_LEN..])
}
