use base64::{engine::general_purpose, Engine as _};
use function_name::named;
use mint_media_proxy::media::{MediaConfig, MediaError};
use mint_media_proxy::store::MediaStore;
use serial_test::serial;
use solana_sdk::pubkey::Pubkey;

use crate::utils::*;

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

fn small_config() -> MediaConfig {
    MediaConfig {
        target_height: 20,
        ..MediaConfig::default()
    }
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_unknown_mint_writes_nothing() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique().to_string();

    let result = setup.service().media(&mint, false).await;
    assert!(matches!(result, Err(MediaError::NotFound(_))));
    assert_eq!(setup.store.count().await.unwrap(), 0);
    assert_eq!(setup.http.call_count(), 0);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_inline_documents_need_no_network() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    let image = data_uri("image/png", &png_bytes(40, 20));
    let doc = data_uri("application/json", &metadata_doc(&image));
    insert_legacy_token(&setup.chain, &mint, 0, &doc);

    let service = setup.service_with_config(small_config());
    let payload = service.image_file(&mint.to_string()).await.unwrap();
    assert_eq!(payload.content_type, "image/png");

    let path = setup
        .cache_root
        .join("solana")
        .join(format!("{}.png", mint));
    let written = std::fs::read(&path).unwrap();
    assert_eq!(written, payload.bytes);
    let resized = image::load_from_memory(&written).unwrap();
    assert_eq!((resized.width(), resized.height()), (40, 20));
    assert_eq!(setup.http.call_count(), 0);

    let row = setup.store.find(&mint.to_string()).await.unwrap().unwrap();
    assert_eq!(row.name, "Legacy Token");
    assert_eq!(row.image_type, "png");
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_remote_image_is_cached_after_first_request() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    insert_legacy_token(&setup.chain, &mint, 2, "ipfs://bafymeta/1.json");
    setup.http.insert(
        "https://ipfs.io/ipfs/bafymeta/1.json",
        metadata_doc("https://img.example.com/1.png?ext=png"),
        Some("application/json"),
    );
    setup
        .http
        .insert("https://img.example.com/1.png?ext=png", png_bytes(60, 30), None);

    let service = setup.service_with_config(small_config());
    let record = service.media(&mint.to_string(), false).await.unwrap();
    assert_eq!(record.decimals, 2);
    assert_eq!(record.image_type, "png");
    assert_eq!(record.symbol, "LEG");

    let first = service.image_file(&mint.to_string()).await.unwrap();
    let resized = image::load_from_memory(&first.bytes).unwrap();
    assert_eq!((resized.width(), resized.height()), (40, 20));
    assert_eq!(setup.http.call_count(), 2);

    let second = service.image_file(&mint.to_string()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(setup.http.call_count(), 2);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_unreachable_document_still_caches_onchain_row() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let mint = Pubkey::new_unique();
    insert_core_asset(&setup.chain, &mint, "https://gone.example.com/meta.json");

    let service = setup.service();
    let result = service.media(&mint.to_string(), false).await;
    assert!(matches!(result, Err(MediaError::Fetch(_))));

    let row = setup.store.find(&mint.to_string()).await.unwrap().unwrap();
    assert_eq!(row.name, "Core Asset");
    assert_eq!(row.image_uri, "");

    let image = service.image_file(&mint.to_string()).await;
    assert!(image.is_err());
    assert!(!setup.cache_root.join("solana").join(format!("{}.jpg", mint)).exists());
}
