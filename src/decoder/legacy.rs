use super::error::DecodeError;
use super::reader::{trim_nul_padding, ByteReader};
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;

const KEY_UNINITIALIZED: u8 = 0;
/// key + update authority + mint + three empty strings + bps + creators tag + two flags.
pub const LEGACY_METADATA_MIN_LEN: usize = 1 + 32 + 32 + 4 * 3 + 2 + 1 + 2;
const CREATOR_LEN: usize = 32 + 1 + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: SerializablePubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub verified: bool,
    pub key: SerializablePubkey,
}

/// Legacy metadata account stored at the metadata PDA of a mint.
///
/// Layout:
/// - key: u8 (account discriminator, 0 is uninitialized)
/// - update_authority: 32 bytes
/// - mint: 32 bytes
/// - name, symbol, uri: u32 length-prefixed strings, NUL padded to their max width
/// - seller_fee_basis_points: u16
/// - creators: Option<Vec<Creator>>
/// - primary_sale_happened: bool
/// - is_mutable: bool
/// - edition_nonce: Option<u8>, token_standard: Option<u8>, collection: Option<Collection>
///
/// The trailer after `is_mutable` was appended by later program versions; old accounts end
/// early or carry zeroed bytes, so it is decoded on a best effort basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMetadata {
    pub key: u8,
    pub update_authority: SerializablePubkey,
    pub mint: SerializablePubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: Option<u8>,
    pub collection: Option<Collection>,
}

struct Trailer {
    edition_nonce: Option<u8>,
    token_standard: Option<u8>,
    collection: Option<Collection>,
}

fn read_trailer(reader: &mut ByteReader) -> Result<Trailer, DecodeError> {
    let edition_nonce = reader.read_option("edition_nonce", |r| r.read_u8("edition_nonce"))?;
    let token_standard = reader.read_option("token_standard", |r| r.read_u8("token_standard"))?;
    let collection = reader.read_option("collection", |r| {
        Ok(Collection {
            verified: r.read_bool("collection.verified")?,
            key: r.read_pubkey("collection.key")?,
        })
    })?;
    Ok(Trailer {
        edition_nonce,
        token_standard,
        collection,
    })
}

impl LegacyMetadata {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(data);
        let key = reader.read_u8("key")?;
        if key == KEY_UNINITIALIZED {
            return Err(DecodeError::Uninitialized {
                layout: "legacy metadata",
            });
        }
        let update_authority = reader.read_pubkey("update_authority")?;
        let mint = reader.read_pubkey("mint")?;
        let name = trim_nul_padding(&reader.read_string("name")?);
        let symbol = trim_nul_padding(&reader.read_string("symbol")?);
        let uri = trim_nul_padding(&reader.read_string("uri")?);
        let seller_fee_basis_points = reader.read_u16("seller_fee_basis_points")?;
        let creators = reader.read_option("creators", |r| {
            r.read_vec("creators", CREATOR_LEN, |r| {
                Ok(Creator {
                    address: r.read_pubkey("creator.address")?,
                    verified: r.read_bool("creator.verified")?,
                    share: r.read_u8("creator.share")?,
                })
            })
        })?;
        let primary_sale_happened = reader.read_bool("primary_sale_happened")?;
        let is_mutable = reader.read_bool("is_mutable")?;

        let trailer = read_trailer(&mut reader).unwrap_or(Trailer {
            edition_nonce: None,
            token_standard: None,
            collection: None,
        });

        Ok(LegacyMetadata {
            key,
            update_authority,
            mint,
            name,
            symbol,
            uri,
            seller_fee_basis_points,
            creators,
            primary_sale_happened,
            is_mutable,
            edition_nonce: trailer.edition_nonce,
            token_standard: trailer.token_standard,
            collection: trailer.collection,
        })
    }
}
