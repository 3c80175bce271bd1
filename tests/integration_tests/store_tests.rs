use function_name::named;
use mint_media_proxy::dao::generated::media;
use mint_media_proxy::store::MediaStore;
use sea_orm::{EntityTrait, PaginatorTrait};
use serial_test::serial;

use crate::utils::*;

fn row(mint: &str, image_uri: &str, created_at: i64) -> media::Model {
    media::Model {
        mint: mint.to_string(),
        decimals: 6,
        image_uri: image_uri.to_string(),
        image_type: "png".to_string(),
        media_uri: None,
        media_type: None,
        local_path: format!("./cache/solana/{}.png", mint),
        name: "Name".to_string(),
        symbol: "SYM".to_string(),
        update_authority: Some("auth".to_string()),
        created_at,
    }
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_upsert_is_idempotent() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let store = setup.store.as_ref();

    store.upsert(row("mintA", "https://a/1.png", 1)).await.unwrap();
    store.upsert(row("mintA", "https://a/1.png", 1)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    let mut updated = row("mintA", "https://a/2.png", 2);
    updated.media_uri = Some("https://a/2.mp4".to_string());
    updated.update_authority = None;
    store.upsert(updated.clone()).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(store.find("mintA").await.unwrap(), Some(updated));
    assert_eq!(store.find("mintB").await.unwrap(), None);
}

#[named]
#[rstest]
#[tokio::test]
#[serial]
async fn test_delete_many_and_count() {
    let name = trim_test_name(function_name!());
    let setup = setup(name).await;
    let store = setup.store.as_ref();

    for mint in ["a", "b", "c", "d"] {
        store.upsert(row(mint, "https://x/1.png", 1)).await.unwrap();
    }
    assert_eq!(store.count().await.unwrap(), 4);

    let deleted = store
        .delete_many(&["a".to_string(), "c".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(store.count().await.unwrap(), 2);
    let rows = media::Entity::find().count(setup.db_conn.as_ref()).await.unwrap();
    assert_eq!(rows, 2);
    assert!(store.find("a").await.unwrap().is_none());
    assert!(store.find("b").await.unwrap().is_some());

    assert_eq!(store.delete_many(&[]).await.unwrap(), 0);
}
