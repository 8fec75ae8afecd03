//! Snapshot integration tests: full engine round-trips through disk

use lookalike::persist::SnapshotStore;
use lookalike::search::SearchEngine;
use std::time::Duration;
use tempfile::TempDir;

fn engine_at(temp: &TempDir) -> SearchEngine {
    SearchEngine::new(
        SnapshotStore::new(temp.path().join("snapshot")),
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn test_round_trip_reproduces_search_results() {
    let temp = TempDir::new().unwrap();

    let original = engine_at(&temp);
    for i in 0..15 {
        let angle = i as f32 * 0.41;
        original
            .add_product(
                &format!("p{}", i % 5),
                &[angle.cos(), angle.sin()],
                &[angle.sin(), angle.cos()],
                &format!("Product {}", i),
                "restored from disk",
                &format!("images/{}.jpg", i),
            )
            .await
            .unwrap();
    }
    original.save().await.unwrap();

    let image_query = [0.8, 0.6];
    let text_query = [0.6, 0.8];
    let image_before = original.search_by_image(&image_query, 4).await.unwrap();
    let hybrid_before = original
        .hybrid_search(Some(&text_query[..]), Some(&image_query[..]), 4, 0.3)
        .await
        .unwrap();

    // Fresh engine instance over the same snapshot directory
    let restored = engine_at(&temp);
    assert!(restored.load().await.unwrap());

    let image_after = restored.search_by_image(&image_query, 4).await.unwrap();
    let hybrid_after = restored
        .hybrid_search(Some(&text_query[..]), Some(&image_query[..]), 4, 0.3)
        .await
        .unwrap();

    assert_eq!(image_before, image_after);
    assert_eq!(hybrid_before, hybrid_after);
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let temp = TempDir::new().unwrap();
    let engine = engine_at(&temp);

    assert!(!engine.load().await.unwrap());

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.products, 0);
    assert_eq!(stats.image_dimension, None);
}

#[tokio::test]
async fn test_load_replaces_in_memory_state() {
    let temp = TempDir::new().unwrap();

    let engine = engine_at(&temp);
    engine
        .add_product("persisted", &[1.0, 0.0], &[1.0, 0.0], "P", "", "p.jpg")
        .await
        .unwrap();
    engine.save().await.unwrap();

    engine
        .add_product("unsaved", &[0.0, 1.0], &[0.0, 1.0], "U", "", "u.jpg")
        .await
        .unwrap();
    assert_eq!(engine.stats().await.unwrap().products, 2);

    // Reloading drops the unsaved product and restores the snapshot state.
    assert!(engine.load().await.unwrap());
    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.products, 1);

    let hits = engine.search_by_image(&[1.0, 0.0], 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].product_id, "persisted");
}

#[tokio::test]
async fn test_corrupt_snapshot_fails_load() {
    let temp = TempDir::new().unwrap();

    let engine = engine_at(&temp);
    engine
        .add_product("a", &[1.0, 0.0], &[1.0, 0.0], "A", "", "a.jpg")
        .await
        .unwrap();
    engine.save().await.unwrap();

    // Damage one artifact in place
    let artifact = temp.path().join("snapshot").join("text_index.json.zst");
    std::fs::write(&artifact, b"not a snapshot artifact").unwrap();

    let fresh = engine_at(&temp);
    assert!(fresh.load().await.is_err());
}

#[tokio::test]
async fn test_save_then_save_again_overwrites_atomically() {
    let temp = TempDir::new().unwrap();

    let engine = engine_at(&temp);
    engine
        .add_product("a", &[1.0, 0.0], &[1.0, 0.0], "A", "", "a.jpg")
        .await
        .unwrap();
    engine.save().await.unwrap();

    engine
        .add_product("b", &[0.0, 1.0], &[0.0, 1.0], "B", "", "b.jpg")
        .await
        .unwrap();
    engine.save().await.unwrap();

    let restored = engine_at(&temp);
    assert!(restored.load().await.unwrap());
    assert_eq!(restored.stats().await.unwrap().products, 2);

    assert!(!temp.path().join("snapshot.tmp").exists());
    assert!(!temp.path().join("snapshot.old").exists());
}
