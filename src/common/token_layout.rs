/// Shared constants for SPL / Token-2022 account byte layouts and the program ids the
/// resolver dispatches on.
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

/// Packed length of the base SPL mint (`COption` authority, supply, decimals, flag,
/// `COption` freeze authority).
pub const MINT_BASE_LEN: usize = 82;
/// SPL token account base length. Extended mints are padded to this length before the
/// account type marker so that mints and token accounts share the TLV offset.
pub const SPL_TOKEN_ACCOUNT_BASE_LEN: usize = 165;
/// Account type marker byte offset in token/mint account data.
pub const TOKEN_ACCOUNT_TYPE_OFFSET: usize = SPL_TOKEN_ACCOUNT_BASE_LEN;

/// AccountType::Mint discriminator value.
pub const ACCOUNT_TYPE_MINT: u8 = 1;

pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
pub const METAPLEX_CORE_PROGRAM_ID: Pubkey =
    pubkey!("CoREENxT6tW1HoK8ypY1SxRMZTcVPm7R94rH4PZNhX7d");

/// Legacy metadata program variants, in the order their PDAs are tried.
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey =
    pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const TOKEN_METADATA_2022_PROGRAM_ID: Pubkey =
    pubkey!("META4s4fSmpkTbZoUsgC1oBnWB31vQcmnN8giPw51Zu");

pub const METADATA_PDA_SEED: &[u8] = b"metadata";
