use base64::{engine::general_purpose, Engine as _};
use function_name::named;
use mint_media_proxy::media::MediaError;
use mint_media_proxy::refresh::{reload_all, warm_all, BatchRefresher};
use mint_media_proxy::store::MediaStore;
use serial_test::serial;
use solana_sdk::pubkey::Pubkey;

use crate::utils::*;

fn inline_doc() -> String {
    let image = format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png_bytes(8, 8))
    );
    format!(
        "data:application/json;base64,{}",
        general_purpose::STANDARD.encode(metadata_doc(&image))
    )
}

/// Ten mints of which the third and eighth have no accounts on chain.
fn seed(setup: &TestSetup) -> (Vec<String>, Vec<String>) {
    let doc = inline_doc();
    let mut keys = Vec::new();
    let mut missing = Vec::new();
    for i in 0..10 {
        let mint = Pubkey::new_unique();
        if i == 2 || i == 7 {
            missing.push(mint.to_string());
        } else {
            insert_legacy_token(&setup.chain, &mint, 0, &doc);
        }
        keys.push(mint.to_string());
    }
    (keys, missing)
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_warm_batch_collects_failures() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let (keys, missing) = seed(&setup);
    let service = setup.service();

    let report = warm_all(&service, &BatchRefresher::new(3), &keys, false).await;
    assert_eq!(report.total, 10);
    assert_eq!(report.success_count(), 8);
    let failed: Vec<String> = report.failures.iter().map(|(key, _)| key.clone()).collect();
    assert_eq!(failed, missing);
    assert!(report
        .failures
        .iter()
        .all(|(_, e)| matches!(e, MediaError::NotFound(_))));

    assert_eq!(setup.store.count().await.unwrap(), 8);
    for key in keys.iter().filter(|key| !missing.contains(key)) {
        let path = setup.cache_root.join("solana").join(format!("{}.png", key));
        assert!(path.exists());
    }
    assert_eq!(setup.http.call_count(), 0);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_reload_deletes_and_optionally_rewarms() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let (keys, _) = seed(&setup);
    let service = setup.service();
    let refresher = BatchRefresher::new(3);
    warm_all(&service, &refresher, &keys, false).await;

    let summary = reload_all(&service, &refresher, &keys[..5], false).await.unwrap();
    assert_eq!(summary.count_before, 8);
    assert_eq!(summary.deleted, 4);
    assert_eq!(summary.count_after, 4);
    assert!(summary.refreshed.is_none());

    let summary = reload_all(&service, &refresher, &keys, true).await.unwrap();
    assert_eq!(summary.deleted, 4);
    assert_eq!(summary.count_after, 0);
    let refreshed = summary.refreshed.unwrap();
    assert_eq!(refreshed.failure_count(), 2);
    assert_eq!(setup.store.count().await.unwrap(), 8);
}
