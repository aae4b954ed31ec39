//! Integration tests for the inventory store with the filesystem blob store

mod common;

use common::{create_temp_inventory, PUBLIC_URL};
use pantrygenie::storage::{BlobStore, InventoryItem, RemoveOutcome};

const USER: &str = "user-a";

#[tokio::test]
async fn test_add_count_matches_quantity() {
    let (store, _blobs, _tmp) = create_temp_inventory();

    for _ in 0..5 {
        store.add(USER, "Rice", None).await.unwrap();
    }
    assert_eq!(
        store.get(USER, "Rice").await.unwrap(),
        Some(InventoryItem::new("Rice", 5))
    );
}

#[tokio::test]
async fn test_last_remove_deletes_item_and_photo() {
    let (store, blobs, tmp) = create_temp_inventory();
    let url = blobs.upload("apple.jpg", vec![0xff, 0xd8]).await.unwrap();
    assert_eq!(url, format!("{}/images/apple.jpg", PUBLIC_URL));

    store.add(USER, "Apple", Some(&url)).await.unwrap();
    store.add(USER, "Apple", None).await.unwrap();

    let first = store.remove(USER, "Apple").await.unwrap();
    assert_eq!(
        first,
        RemoveOutcome::Decremented(InventoryItem::new("Apple", 1).with_image(url.clone()))
    );
    assert!(tmp.path().join("blobs/images/apple.jpg").exists());

    assert_eq!(store.remove(USER, "Apple").await.unwrap(), RemoveOutcome::Deleted);
    assert!(store.get(USER, "Apple").await.unwrap().is_none());
    assert!(!tmp.path().join("blobs/images/apple.jpg").exists());
}

#[tokio::test]
async fn test_rename_keeps_document_contents() {
    let (store, blobs, _tmp) = create_temp_inventory();
    let url = blobs.upload("oats.png", vec![1]).await.unwrap();
    store.add(USER, "Oats", Some(&url)).await.unwrap();
    store.add(USER, "Oats", None).await.unwrap();

    assert!(store.rename(USER, "Oats", "Rolled Oats").await.unwrap());
    assert!(store.get(USER, "Oats").await.unwrap().is_none());
    assert_eq!(
        store.get(USER, "Rolled Oats").await.unwrap(),
        Some(InventoryItem::new("Rolled Oats", 2).with_image(url))
    );

    assert!(!store.rename(USER, "Rolled Oats", "Rolled Oats").await.unwrap());
}

#[tokio::test]
async fn test_subscription_sees_every_mutation() {
    let (store, _blobs, _tmp) = create_temp_inventory();
    let mut subscription = store.subscribe(USER).await.unwrap();
    assert!(subscription.latest().is_empty());

    store.add(USER, "Egg", None).await.unwrap();
    assert_eq!(
        subscription.changed().await.unwrap(),
        vec![InventoryItem::new("Egg", 1)]
    );

    store.add(USER, "Milk", None).await.unwrap();
    assert_eq!(
        subscription.changed().await.unwrap(),
        vec![InventoryItem::new("Egg", 1), InventoryItem::new("Milk", 1)]
    );

    store.rename(USER, "Milk", "Oat Milk").await.unwrap();
    assert_eq!(
        subscription.changed().await.unwrap(),
        vec![InventoryItem::new("Egg", 1), InventoryItem::new("Oat Milk", 1)]
    );

    store.remove(USER, "Egg").await.unwrap();
    assert_eq!(
        subscription.changed().await.unwrap(),
        vec![InventoryItem::new("Oat Milk", 1)]
    );
}

#[tokio::test]
async fn test_users_do_not_share_inventory() {
    let (store, _blobs, _tmp) = create_temp_inventory();
    store.add("alice", "Tea", None).await.unwrap();
    store.add("bob", "Coffee", None).await.unwrap();

    assert_eq!(store.list("alice").await.unwrap(), vec![InventoryItem::new("Tea", 1)]);
    assert_eq!(store.list("bob").await.unwrap(), vec![InventoryItem::new("Coffee", 1)]);
}
