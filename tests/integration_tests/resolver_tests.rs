use function_name::named;
use mint_media_proxy::common::typedefs::serializable_pubkey::SerializablePubkey;
use mint_media_proxy::decoder::extensions::extension_tag;
use mint_media_proxy::decoder::Protocol;
use mint_media_proxy::resolver::ResolveError;
use serial_test::serial;
use solana_sdk::pubkey::Pubkey;

use crate::utils::*;

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_missing_accounts_are_not_found() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();

    let result = setup.resolver().resolve(&mint.to_string()).await;
    assert_eq!(result, Err(ResolveError::NotFound(mint.to_string())));
    assert_eq!(setup.chain.call_count(), 1);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_invalid_key_skips_rpc() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;

    let result = setup.resolver().resolve("definitely-not-base58!").await;
    assert!(matches!(result, Err(ResolveError::InvalidKey(_))));
    assert_eq!(setup.chain.call_count(), 0);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_legacy_metadata_with_creators() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    insert_legacy_token(&setup.chain, &mint, 9, "https://example.com/legacy.json");

    let metadata = setup.resolver().resolve(&mint.to_string()).await.unwrap();
    assert_eq!(metadata.protocol, Protocol::Legacy);
    assert_eq!(metadata.mint_decimals, 9);
    assert_eq!(metadata.name, "Legacy Token");
    assert_eq!(metadata.uri, "https://example.com/legacy.json");
    assert_eq!(metadata.creators, Some(vec![SerializablePubkey::from([3u8; 32])]));

    let creators = setup.resolver().creator_keys(&mint.to_string()).await.unwrap();
    assert_eq!(creators.len(), 1);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_core_asset_takes_precedence_over_legacy() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    insert_legacy_token(&setup.chain, &mint, 0, "https://example.com/legacy.json");
    insert_core_asset(&setup.chain, &mint, "https://example.com/core.json");

    let metadata = setup.resolver().resolve(&mint.to_string()).await.unwrap();
    assert_eq!(metadata.protocol, Protocol::Core);
    assert_eq!(metadata.uri, "https://example.com/core.json");
    assert_eq!(metadata.mint_decimals, 0);
    assert_eq!(metadata.symbol, "");
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_embedded_metadata_after_unknown_extensions() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    insert_token22(
        &setup.chain,
        &mint,
        &[
            (999, vec![0xAB; 13]),
            (extension_tag::NON_TRANSFERABLE, Vec::new()),
            (
                extension_tag::TOKEN_METADATA,
                token_metadata_payload(&mint, "Embedded", "EMB", "https://example.com/t22.json"),
            ),
            (1234, vec![1, 2, 3]),
        ],
    );

    let metadata = setup.resolver().resolve(&mint.to_string()).await.unwrap();
    assert_eq!(metadata.protocol, Protocol::Token22Embedded);
    assert_eq!(metadata.mint_decimals, 6);
    assert_eq!(metadata.name, "Embedded");
    assert_eq!(metadata.symbol, "EMB");
    assert_eq!(metadata.update_authority, Some(SerializablePubkey::from([7u8; 32])));
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_token22_without_embedded_metadata_falls_back_to_legacy() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    insert_legacy_token(&setup.chain, &mint, 0, "https://example.com/legacy.json");
    insert_token22(&setup.chain, &mint, &[(extension_tag::NON_TRANSFERABLE, Vec::new())]);

    let metadata = setup.resolver().resolve(&mint.to_string()).await.unwrap();
    assert_eq!(metadata.protocol, Protocol::Legacy);
    assert_eq!(metadata.mint_decimals, 6);
}
