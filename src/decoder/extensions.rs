use std::collections::HashMap;

use log::debug;

use super::error::DecodeError;
use super::reader::ByteReader;
use crate::common::token_layout::SPL_TOKEN_ACCOUNT_BASE_LEN;
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;

/// Token-2022 extension type tags.
pub mod extension_tag {
    pub const UNINITIALIZED: u16 = 0;
    pub const TRANSFER_FEE_CONFIG: u16 = 1;
    pub const TRANSFER_FEE_AMOUNT: u16 = 2;
    pub const MINT_CLOSE_AUTHORITY: u16 = 3;
    pub const CONFIDENTIAL_TRANSFER_MINT: u16 = 4;
    pub const DEFAULT_ACCOUNT_STATE: u16 = 6;
    pub const NON_TRANSFERABLE: u16 = 9;
    pub const INTEREST_BEARING_CONFIG: u16 = 10;
    pub const PERMANENT_DELEGATE: u16 = 12;
    pub const TRANSFER_HOOK: u16 = 14;
    pub const METADATA_POINTER: u16 = 18;
    pub const TOKEN_METADATA: u16 = 19;
    pub const GROUP_POINTER: u16 = 20;
    pub const TOKEN_GROUP: u16 = 21;
    pub const GROUP_MEMBER_POINTER: u16 = 22;
    pub const TOKEN_GROUP_MEMBER: u16 = 23;
}

/// Tag and length header preceding every record.
pub const TLV_HEADER_LEN: usize = 4;
/// A record needs at least a tag and one length byte to be worth reading.
const MIN_RECORD_LEN: usize = 3;

/// One raw tag/length/value record borrowed from the account buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionRecord<'a> {
    pub tag: u16,
    pub length: u16,
    /// Absolute offset of the tag within the account data.
    pub offset: usize,
    pub payload: &'a [u8],
}

impl ExtensionRecord<'_> {
    /// Absolute offset of the first byte after this record.
    pub fn end_offset(&self) -> usize {
        self.offset + TLV_HEADER_LEN + self.length as usize
    }
}

/// Iterates the records of an extension region. The region starts with the account type
/// marker; a zero marker means the extensions were never initialized and nothing is yielded.
pub struct TlvRecords<'a> {
    reader: ByteReader<'a>,
    done: bool,
}

impl<'a> TlvRecords<'a> {
    pub fn new(region: &'a [u8], base_offset: usize) -> Self {
        let mut reader = ByteReader::with_base(region, base_offset);
        let initialized = matches!(reader.read_u8("account_type"), Ok(marker) if marker != 0);
        TlvRecords {
            reader,
            done: !initialized,
        }
    }

    fn read_record(&mut self) -> Result<Option<ExtensionRecord<'a>>, DecodeError> {
        let offset = self.reader.offset();
        let tag = self.reader.read_u16("extension_tag")?;
        if tag == extension_tag::UNINITIALIZED {
            return Ok(None);
        }
        let length = self.reader.read_u16("extension_length")?;
        let payload = self.reader.read_bytes("extension_payload", length as usize)?;
        Ok(Some(ExtensionRecord {
            tag,
            length,
            offset,
            payload,
        }))
    }
}

impl<'a> Iterator for TlvRecords<'a> {
    type Item = Result<ExtensionRecord<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.remaining() < MIN_RECORD_LEN {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferFee {
    pub epoch: u64,
    pub maximum_fee: u64,
    pub transfer_fee_basis_points: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferFeeConfig {
    pub transfer_fee_config_authority: Option<SerializablePubkey>,
    pub withdraw_withheld_authority: Option<SerializablePubkey>,
    pub withheld_amount: u64,
    pub older_transfer_fee: TransferFee,
    pub newer_transfer_fee: TransferFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Uninitialized,
    Initialized,
    Frozen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultAccountState {
    pub state: AccountState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCloseAuthority {
    pub close_authority: Option<SerializablePubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermanentDelegate {
    pub delegate: Option<SerializablePubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPointer {
    pub authority: Option<SerializablePubkey>,
    pub metadata_address: Option<SerializablePubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPointer {
    pub authority: Option<SerializablePubkey>,
    pub group_address: Option<SerializablePubkey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMemberPointer {
    pub authority: Option<SerializablePubkey>,
    pub member_address: Option<SerializablePubkey>,
}

/// Metadata embedded directly in the mint's extension region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenMetadata {
    pub update_authority: Option<SerializablePubkey>,
    pub mint: SerializablePubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub additional_metadata: Vec<(String, String)>,
}

/// Typed extension values found on a mint. Extensions that are absent stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MintExtensions {
    pub transfer_fee_config: Option<TransferFeeConfig>,
    pub mint_close_authority: Option<MintCloseAuthority>,
    pub default_account_state: Option<DefaultAccountState>,
    pub non_transferable: bool,
    pub permanent_delegate: Option<PermanentDelegate>,
    pub metadata_pointer: Option<MetadataPointer>,
    pub token_metadata: Option<TokenMetadata>,
    pub group_pointer: Option<GroupPointer>,
    pub group_member_pointer: Option<GroupMemberPointer>,
    /// Tags that had no registered decoder and were skipped by their declared length.
    pub skipped_tags: Vec<u16>,
}

impl MintExtensions {
    /// Basis points of the newer transfer fee, zero when the mint has no fee config.
    pub fn transfer_fee_bps(&self) -> u16 {
        self.transfer_fee_config
            .as_ref()
            .map(|cfg| cfg.newer_transfer_fee.transfer_fee_basis_points)
            .unwrap_or_default()
    }
}

/// Decodes one record payload into `MintExtensions`. The reader covers exactly the payload.
pub type ExtensionDecoder = fn(&mut ByteReader, &mut MintExtensions) -> Result<(), DecodeError>;

fn read_transfer_fee(reader: &mut ByteReader) -> Result<TransferFee, DecodeError> {
    Ok(TransferFee {
        epoch: reader.read_u64("transfer_fee.epoch")?,
        maximum_fee: reader.read_u64("transfer_fee.maximum_fee")?,
        transfer_fee_basis_points: reader.read_u16("transfer_fee.basis_points")?,
    })
}

fn decode_transfer_fee_config(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.transfer_fee_config = Some(TransferFeeConfig {
        transfer_fee_config_authority: reader
            .read_nonzero_pubkey("transfer_fee_config.config_authority")?,
        withdraw_withheld_authority: reader
            .read_nonzero_pubkey("transfer_fee_config.withdraw_authority")?,
        withheld_amount: reader.read_u64("transfer_fee_config.withheld_amount")?,
        older_transfer_fee: read_transfer_fee(reader)?,
        newer_transfer_fee: read_transfer_fee(reader)?,
    });
    Ok(())
}

fn decode_mint_close_authority(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.mint_close_authority = Some(MintCloseAuthority {
        close_authority: reader.read_nonzero_pubkey("mint_close_authority")?,
    });
    Ok(())
}

fn decode_default_account_state(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    let offset = reader.offset();
    let state = match reader.read_u8("default_account_state")? {
        0 => AccountState::Uninitialized,
        1 => AccountState::Initialized,
        2 => AccountState::Frozen,
        value => {
            return Err(DecodeError::InvalidValue {
                field: "default_account_state",
                offset,
                value: value as u64,
            })
        }
    };
    extensions.default_account_state = Some(DefaultAccountState { state });
    Ok(())
}

fn decode_non_transferable(
    _reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.non_transferable = true;
    Ok(())
}

fn decode_permanent_delegate(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.permanent_delegate = Some(PermanentDelegate {
        delegate: reader.read_nonzero_pubkey("permanent_delegate")?,
    });
    Ok(())
}

fn decode_metadata_pointer(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.metadata_pointer = Some(MetadataPointer {
        authority: reader.read_nonzero_pubkey("metadata_pointer.authority")?,
        metadata_address: reader.read_nonzero_pubkey("metadata_pointer.metadata_address")?,
    });
    Ok(())
}

fn decode_token_metadata(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    let update_authority = reader.read_nonzero_pubkey("token_metadata.update_authority")?;
    let mint = reader.read_pubkey("token_metadata.mint")?;
    let name = reader.read_string("token_metadata.name")?;
    let symbol = reader.read_string("token_metadata.symbol")?;
    let uri = reader.read_string("token_metadata.uri")?;
    // Each pair is two length-prefixed strings, so at least 8 bytes.
    let additional_metadata = reader.read_vec("token_metadata.additional_metadata", 8, |r| {
        Ok((
            r.read_string("token_metadata.additional_key")?,
            r.read_string("token_metadata.additional_value")?,
        ))
    })?;
    extensions.token_metadata = Some(TokenMetadata {
        update_authority,
        mint,
        name,
        symbol,
        uri,
        additional_metadata,
    });
    Ok(())
}

fn decode_group_pointer(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.group_pointer = Some(GroupPointer {
        authority: reader.read_nonzero_pubkey("group_pointer.authority")?,
        group_address: reader.read_nonzero_pubkey("group_pointer.group_address")?,
    });
    Ok(())
}

fn decode_group_member_pointer(
    reader: &mut ByteReader,
    extensions: &mut MintExtensions,
) -> Result<(), DecodeError> {
    extensions.group_member_pointer = Some(GroupMemberPointer {
        authority: reader.read_nonzero_pubkey("group_member_pointer.authority")?,
        member_address: reader.read_nonzero_pubkey("group_member_pointer.member_address")?,
    });
    Ok(())
}

/// Tag to decoder dispatch table used by the extension scan.
#[derive(Clone)]
pub struct ExtensionRegistry {
    decoders: HashMap<u16, ExtensionDecoder>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        let mut registry = ExtensionRegistry::empty();
        registry
            .register(extension_tag::TRANSFER_FEE_CONFIG, decode_transfer_fee_config)
            .register(extension_tag::MINT_CLOSE_AUTHORITY, decode_mint_close_authority)
            .register(extension_tag::DEFAULT_ACCOUNT_STATE, decode_default_account_state)
            .register(extension_tag::NON_TRANSFERABLE, decode_non_transferable)
            .register(extension_tag::PERMANENT_DELEGATE, decode_permanent_delegate)
            .register(extension_tag::METADATA_POINTER, decode_metadata_pointer)
            .register(extension_tag::TOKEN_METADATA, decode_token_metadata)
            .register(extension_tag::GROUP_POINTER, decode_group_pointer)
            .register(extension_tag::GROUP_MEMBER_POINTER, decode_group_member_pointer);
        registry
    }
}

impl ExtensionRegistry {
    pub fn empty() -> Self {
        ExtensionRegistry {
            decoders: HashMap::new(),
        }
    }

    pub fn register(&mut self, tag: u16, decoder: ExtensionDecoder) -> &mut Self {
        self.decoders.insert(tag, decoder);
        self
    }

    pub fn is_registered(&self, tag: u16) -> bool {
        self.decoders.contains_key(&tag)
    }

    /// Decodes the extension region that follows the 165-byte base layout.
    pub fn decode(&self, region: &[u8]) -> Result<MintExtensions, DecodeError> {
        self.decode_at(region, SPL_TOKEN_ACCOUNT_BASE_LEN)
    }

    /// Same as [`decode`](Self::decode) with an explicit absolute offset for error context.
    pub fn decode_at(
        &self,
        region: &[u8],
        base_offset: usize,
    ) -> Result<MintExtensions, DecodeError> {
        let mut extensions = MintExtensions::default();
        for record in TlvRecords::new(region, base_offset) {
            let record = record?;
            match self.decoders.get(&record.tag) {
                Some(decoder) => {
                    let mut reader =
                        ByteReader::with_base(record.payload, record.offset + TLV_HEADER_LEN);
                    decoder(&mut reader, &mut extensions)?;
                }
                None => {
                    debug!(
                        "Skipping extension {} ({} bytes) at offset {}",
                        record.tag, record.length, record.offset
                    );
                    extensions.skipped_tags.push(record.tag);
                }
            }
        }
        Ok(extensions)
    }
}
