pub mod error;
pub mod pda;
pub mod rpc;

use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};
use solana_sdk::pubkey::Pubkey;

use crate::common::token_layout::{METAPLEX_CORE_PROGRAM_ID, TOKEN_2022_PROGRAM_ID};
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;
use crate::decoder::extensions::ExtensionRegistry;
use crate::decoder::mint::{extension_region, MintHeader};
use crate::decoder::NormalizedMetadata;

pub use error::ResolveError;
pub use rpc::{AccountBytes, AccountFetcher, RpcAccountFetcher};

pub fn parse_mint(key: &str) -> Result<Pubkey, ResolveError> {
    Pubkey::from_str(key).map_err(|_| ResolveError::InvalidKey(key.to_string()))
}

/// Turns a mint address into normalized metadata by fetching the mint and its legacy
/// metadata PDAs in one batch and picking the first protocol that decodes.
///
/// Precedence: Core asset, then metadata embedded in a Token-2022 mint, then the legacy
/// PDAs in program order.
pub struct MetadataResolver {
    fetcher: Arc<dyn AccountFetcher>,
    registry: ExtensionRegistry,
}

impl MetadataResolver {
    pub fn new(fetcher: Arc<dyn AccountFetcher>) -> Self {
        Self::with_registry(fetcher, ExtensionRegistry::default())
    }

    pub fn with_registry(fetcher: Arc<dyn AccountFetcher>, registry: ExtensionRegistry) -> Self {
        MetadataResolver { fetcher, registry }
    }

    pub async fn resolve(&self, key: &str) -> Result<NormalizedMetadata, ResolveError> {
        let mint = parse_mint(key)?;
        self.resolve_mint(&mint).await
    }

    pub async fn resolve_mint(&self, mint: &Pubkey) -> Result<NormalizedMetadata, ResolveError> {
        let candidates = pda::metadata_candidates(mint);
        let addresses = [*mint, candidates[0], candidates[1]];
        let accounts = self.fetcher.get_multiple_accounts(&addresses).await?;

        let mint_account = accounts.first().cloned().flatten();
        let candidate_accounts: Vec<Option<AccountBytes>> = (1..addresses.len())
            .map(|i| accounts.get(i).cloned().flatten())
            .collect();

        self.decode_accounts(mint, mint_account.as_ref(), &candidate_accounts)
    }

    /// Dispatch over already fetched accounts. `candidates` are the legacy metadata PDAs in
    /// the order they should be tried.
    pub fn decode_accounts(
        &self,
        mint: &Pubkey,
        mint_account: Option<&AccountBytes>,
        candidates: &[Option<AccountBytes>],
    ) -> Result<NormalizedMetadata, ResolveError> {
        let mut decimals = 0;
        if let Some(account) = mint_account {
            match self.decode_mint_account(mint, account) {
                Ok(metadata) => return Ok(metadata),
                Err(ResolveError::Decode(e)) => {
                    warn!("Failed to decode mint account {}: {}", mint, e);
                }
                Err(e) => debug!("{}", e),
            }
            if account.owner != METAPLEX_CORE_PROGRAM_ID {
                decimals = MintHeader::decode(&account.data)
                    .map(|header| header.decimals)
                    .unwrap_or_default();
            }
        }

        for (index, candidate) in candidates.iter().enumerate() {
            let Some(candidate) = candidate else {
                continue;
            };
            match NormalizedMetadata::from_legacy(&candidate.data, decimals) {
                Ok(metadata) => return Ok(metadata),
                Err(e) => warn!(
                    "Failed to decode legacy metadata candidate {} for {}: {}",
                    index, mint, e
                ),
            }
        }

        Err(ResolveError::NotFound(mint.to_string()))
    }

    /// Decodes metadata carried by the mint account itself: a Core asset, or a
    /// Token-2022 mint with an embedded TokenMetadata extension.
    pub fn decode_mint_account(
        &self,
        mint: &Pubkey,
        account: &AccountBytes,
    ) -> Result<NormalizedMetadata, ResolveError> {
        if account.owner == METAPLEX_CORE_PROGRAM_ID {
            return Ok(NormalizedMetadata::from_core(&account.data)?);
        }

        let decimals = match MintHeader::decode(&account.data) {
            Ok(header) => header.decimals,
            Err(e) => {
                debug!("Mint header for {} not decodable: {}", mint, e);
                0
            }
        };
        let extensions = match extension_region(&account.data) {
            Some(region) => Some(self.registry.decode(region)?),
            None => None,
        };

        if account.owner == TOKEN_2022_PROGRAM_ID {
            if let Some(token_metadata) = extensions.and_then(|ext| ext.token_metadata) {
                return Ok(NormalizedMetadata::from_token_metadata(
                    &token_metadata,
                    decimals,
                ));
            }
        }

        Err(ResolveError::UnsupportedProtocol {
            mint: mint.to_string(),
            protocol: protocol_name(&account.owner),
        })
    }

    pub async fn creator_keys(&self, key: &str) -> Result<Vec<SerializablePubkey>, ResolveError> {
        let metadata = self.resolve(key).await?;
        metadata
            .creators
            .ok_or_else(|| ResolveError::NoCreators(key.to_string()))
    }
}

fn protocol_name(owner: &Pubkey) -> &'static str {
    if *owner == METAPLEX_CORE_PROGRAM_ID {
        "core"
    } else if *owner == TOKEN_2022_PROGRAM_ID {
        "token-2022"
    } else {
        "spl-token"
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-memory chain keyed by address.
    #[derive(Default)]
    pub struct MockAccountFetcher {
        pub accounts: HashMap<Pubkey, AccountBytes>,
        pub calls: AtomicUsize,
        /// Returns only the first `n` entries when set.
        pub truncate: Option<usize>,
    }

    impl MockAccountFetcher {
        pub fn with_account(mut self, address: Pubkey, owner: Pubkey, data: Vec<u8>) -> Self {
            self.accounts.insert(address, AccountBytes { data, owner });
            self
        }
    }

    #[async_trait::async_trait]
    impl AccountFetcher for MockAccountFetcher {
        async fn get_multiple_accounts(
            &self,
            addresses: &[Pubkey],
        ) -> Result<Vec<Option<AccountBytes>>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut accounts: Vec<_> = addresses
                .iter()
                .map(|address| self.accounts.get(address).cloned())
                .collect();
            if let Some(n) = self.truncate {
                accounts.truncate(n);
            }
            Ok(accounts)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::test_utils::MockAccountFetcher;
    use super::*;
    use crate::common::token_layout::{SPL_TOKEN_ACCOUNT_BASE_LEN, TOKEN_PROGRAM_ID};
    use crate::decoder::core_asset::test_utils::encode_core_asset;
    use crate::decoder::extensions::extension_tag;
    use crate::decoder::extensions::test_utils::{region, token_metadata_payload};
    use crate::decoder::legacy::test_utils::LegacyFixture;
    use crate::decoder::Protocol;

    fn mint_bytes(decimals: u8) -> Vec<u8> {
        MintHeader {
            supply: 1,
            decimals,
            is_initialized: true,
            ..Default::default()
        }
        .encode()
    }

    fn token22_mint(decimals: u8, tlv: Vec<u8>) -> Vec<u8> {
        let mut data = mint_bytes(decimals);
        data.resize(SPL_TOKEN_ACCOUNT_BASE_LEN, 0);
        data.extend_from_slice(&tlv);
        data
    }

    fn legacy(name: &str, mint: &Pubkey) -> Vec<u8> {
        LegacyFixture {
            update_authority: [9; 32],
            mint: mint.to_bytes(),
            name,
            symbol: "LGC",
            uri: "https://example.com/legacy.json",
            creators: Some(vec![([5; 32], true, 100)]),
        }
        .encode()
    }

    fn resolver(fetcher: MockAccountFetcher) -> MetadataResolver {
        MetadataResolver::new(Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_missing_accounts_not_found() {
        let mint = Pubkey::new_unique();
        let result = resolver(MockAccountFetcher::default())
            .resolve(&mint.to_string())
            .await;
        assert_eq!(result, Err(ResolveError::NotFound(mint.to_string())));
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let fetcher = Arc::new(MockAccountFetcher::default());
        let result = MetadataResolver::new(fetcher.clone())
            .resolve("not-a-key")
            .await;
        assert!(matches!(result, Err(ResolveError::InvalidKey(_))));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_legacy_metadata_with_decimals() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let fetcher = MockAccountFetcher::default()
            .with_account(mint, TOKEN_PROGRAM_ID, mint_bytes(6))
            .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy\0\0", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.protocol, Protocol::Legacy);
        assert_eq!(metadata.mint_decimals, 6);
        assert_eq!(metadata.name, "Legacy");
        assert_eq!(metadata.creators, Some(vec![SerializablePubkey::from([5; 32])]));
    }

    #[tokio::test]
    async fn test_second_candidate_used_when_first_is_corrupt() {
        let mint = Pubkey::new_unique();
        let [first, second] = pda::metadata_candidates(&mint);
        let fetcher = MockAccountFetcher::default()
            .with_account(first, pda::METADATA_PROGRAMS[0], vec![4, 1, 2])
            .with_account(second, pda::METADATA_PROGRAMS[1], legacy("Second", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.name, "Second");
        assert_eq!(metadata.mint_decimals, 0);
    }

    #[tokio::test]
    async fn test_core_takes_precedence() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let fetcher = MockAccountFetcher::default()
            .with_account(
                mint,
                METAPLEX_CORE_PROGRAM_ID,
                encode_core_asset([1; 32], [2; 32], "Core", "https://example.com/core.json"),
            )
            .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.protocol, Protocol::Core);
        assert_eq!(metadata.name, "Core");
    }

    #[tokio::test]
    async fn test_undecodable_core_asset_falls_back_to_legacy() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let mut truncated =
            encode_core_asset([1; 32], [2; 32], "Core", "https://example.com/core.json");
        truncated.truncate(40);
        let fetcher = MockAccountFetcher::default()
            .with_account(mint, METAPLEX_CORE_PROGRAM_ID, truncated)
            .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.protocol, Protocol::Legacy);
        assert_eq!(metadata.name, "Legacy");
        assert_eq!(metadata.mint_decimals, 0);
    }

    #[tokio::test]
    async fn test_embedded_metadata_beats_legacy_pda() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let tlv = region(&[
            (0x6000, vec![0; 7]),
            (
                extension_tag::TOKEN_METADATA,
                token_metadata_payload(
                    [3; 32],
                    mint.to_bytes(),
                    "Embedded",
                    "EMB",
                    "https://e/1",
                    &[],
                ),
            ),
        ]);
        let fetcher = MockAccountFetcher::default()
            .with_account(mint, TOKEN_2022_PROGRAM_ID, token22_mint(9, tlv))
            .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.protocol, Protocol::Token22Embedded);
        assert_eq!(metadata.mint_decimals, 9);
        assert_eq!(metadata.name, "Embedded");
        assert_eq!(metadata.update_authority, Some(SerializablePubkey::from([3; 32])));
    }

    #[tokio::test]
    async fn test_token22_without_embedded_metadata_falls_back() {
        let mint = Pubkey::new_unique();
        let second = pda::metadata_candidates(&mint)[1];
        let tlv = region(&[(extension_tag::NON_TRANSFERABLE, vec![])]);
        let fetcher = MockAccountFetcher::default()
            .with_account(mint, TOKEN_2022_PROGRAM_ID, token22_mint(2, tlv))
            .with_account(second, pda::METADATA_PROGRAMS[1], legacy("Fallback", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.protocol, Protocol::Legacy);
        assert_eq!(metadata.mint_decimals, 2);
    }

    #[tokio::test]
    async fn test_corrupt_extensions_fall_back_to_legacy() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let tlv = region(&[(extension_tag::TOKEN_METADATA, vec![1; 20])]);
        let fetcher = MockAccountFetcher::default()
            .with_account(mint, TOKEN_2022_PROGRAM_ID, token22_mint(0, tlv))
            .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy", &mint));
        let metadata = resolver(fetcher).resolve_mint(&mint).await.unwrap();
        assert_eq!(metadata.protocol, Protocol::Legacy);
    }

    #[tokio::test]
    async fn test_short_rpc_response() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let fetcher = MockAccountFetcher {
            truncate: Some(1),
            ..Default::default()
        }
        .with_account(mint, TOKEN_PROGRAM_ID, mint_bytes(0))
        .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy", &mint));
        let result = resolver(fetcher).resolve_mint(&mint).await;
        assert_eq!(result, Err(ResolveError::NotFound(mint.to_string())));
    }

    #[tokio::test]
    async fn test_creator_keys() {
        let mint = Pubkey::new_unique();
        let pda = pda::metadata_candidates(&mint)[0];
        let fetcher = MockAccountFetcher::default()
            .with_account(pda, pda::METADATA_PROGRAMS[0], legacy("Legacy", &mint));
        let keys = resolver(fetcher)
            .creator_keys(&mint.to_string())
            .await
            .unwrap();
        assert_eq!(keys, vec![SerializablePubkey::from([5; 32])]);
    }
}
