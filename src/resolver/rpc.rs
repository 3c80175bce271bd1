use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tokio::time::timeout;

use super::error::ResolveError;

pub const RPC_TIMEOUT_MS: u64 = 5000;

/// Raw account data together with its owning program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBytes {
    pub data: Vec<u8>,
    pub owner: Pubkey,
}

impl From<Account> for AccountBytes {
    fn from(account: Account) -> Self {
        AccountBytes {
            data: account.data,
            owner: account.owner,
        }
    }
}

/// Chain access used by the resolver. Implementations may return fewer entries than
/// requested; callers treat missing positions as absent accounts.
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<AccountBytes>>, ResolveError>;
}

pub struct RpcAccountFetcher {
    client: Arc<RpcClient>,
    timeout: Duration,
}

impl RpcAccountFetcher {
    pub fn new(client: Arc<RpcClient>) -> Self {
        RpcAccountFetcher {
            client,
            timeout: Duration::from_millis(RPC_TIMEOUT_MS),
        }
    }
}

#[async_trait]
impl AccountFetcher for RpcAccountFetcher {
    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<AccountBytes>>, ResolveError> {
        let result = timeout(
            self.timeout,
            self.client
                .get_multiple_accounts_with_commitment(addresses, CommitmentConfig::confirmed()),
        )
        .await;

        match result {
            Ok(Ok(response)) => Ok(response
                .value
                .into_iter()
                .map(|account| account.map(AccountBytes::from))
                .collect()),
            Ok(Err(e)) => Err(ResolveError::Rpc(e.to_string())),
            Err(_) => Err(ResolveError::Rpc("RPC timeout".to_string())),
        }
    }
}
