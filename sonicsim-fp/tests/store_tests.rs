//! Fingerprint store integration tests against a file-backed database

mod helpers;

use helpers::{create_test_store, small_batch_store};
use sonicsim_fp::{Fingerprint, FingerprintEntry, HashValue};

fn entry(anchor: u32, target: u32, delta: u32, offset: u32) -> FingerprintEntry {
    FingerprintEntry::new(HashValue::pack(anchor, target, delta).unwrap(), offset)
}

/// `count` distinct hashes starting at anchor bin `base`
fn distinct_fingerprint(base: u32, count: u32) -> Fingerprint {
    (0..count)
        .map(|i| entry(base + i / 1000, i % 1000, 1 + i % 7, i))
        .collect()
}

#[tokio::test]
async fn test_save_is_idempotent_and_replaces() {
    let (_dir, store) = create_test_store().await.unwrap();
    let first = distinct_fingerprint(0, 50);
    let second = distinct_fingerprint(1, 20);

    store.save("kick.wav", &first).await.unwrap();
    store.save("kick.wav", &first).await.unwrap();
    assert_eq!(store.row_count(Some("kick.wav")).await.unwrap(), 50);
    assert_eq!(store.load("kick.wav").await.unwrap(), first);

    store.save("kick.wav", &second).await.unwrap();
    assert_eq!(store.row_count(None).await.unwrap(), 20);
    assert_eq!(store.load("kick.wav").await.unwrap(), second);
}

#[tokio::test]
async fn test_empty_save_clears_stale_rows() {
    let (_dir, store) = create_test_store().await.unwrap();
    store.save("pad.wav", &distinct_fingerprint(0, 10)).await.unwrap();
    assert!(store.has("pad.wav").await.unwrap());

    store.save("pad.wav", &Fingerprint::new()).await.unwrap();
    assert!(!store.has("pad.wav").await.unwrap());
    assert!(store.load("pad.wav").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chunked_insert_preserves_order() {
    let (_dir, store) = small_batch_store(900, 7).await.unwrap();
    let fp = distinct_fingerprint(3, 101);

    store.save("loop.wav", &fp).await.unwrap();
    assert_eq!(store.load("loop.wav").await.unwrap(), fp);
}

#[tokio::test]
async fn test_remove_sample_cascades() {
    let (_dir, store) = create_test_store().await.unwrap();
    assert!(store.register_sample("snare.wav").await.unwrap());
    assert!(store.register_sample("hat.wav").await.unwrap());
    store.save("snare.wav", &distinct_fingerprint(0, 30)).await.unwrap();
    store.save("hat.wav", &distinct_fingerprint(2, 30)).await.unwrap();

    assert!(store.remove_sample("snare.wav").await.unwrap());
    assert_eq!(store.row_count(Some("snare.wav")).await.unwrap(), 0);
    assert_eq!(store.row_count(Some("hat.wav")).await.unwrap(), 30);

    assert!(!store.remove_sample("snare.wav").await.unwrap());
}

#[tokio::test]
async fn test_register_duplicate_is_noop() {
    let (_dir, store) = create_test_store().await.unwrap();
    assert!(store.register_sample("a.wav").await.unwrap());
    assert!(!store.register_sample("a.wav").await.unwrap());
    assert_eq!(store.paths_missing_fingerprint(10).await.unwrap(), vec!["a.wav".to_string()]);
}

#[tokio::test]
async fn test_paths_missing_fingerprint_order_and_limit() {
    let (_dir, store) = create_test_store().await.unwrap();
    for name in ["c.wav", "a.wav", "b.wav", "d.wav"] {
        store.register_sample(name).await.unwrap();
    }
    store.save("a.wav", &distinct_fingerprint(0, 5)).await.unwrap();

    assert_eq!(
        store.paths_missing_fingerprint(10).await.unwrap(),
        vec!["c.wav".to_string(), "b.wav".to_string(), "d.wav".to_string()]
    );
    assert_eq!(store.paths_missing_fingerprint(2).await.unwrap().len(), 2);
    assert!(store.paths_missing_fingerprint(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_candidate_lookup_spans_chunks() {
    // Lookup batches of 100 hashes; the shared hash sits in the last batch
    let (_dir, store) = small_batch_store(100, 300).await.unwrap();
    let query = distinct_fingerprint(0, 950);
    let shared = query.entries()[949];

    store.save("far.wav", &Fingerprint::from_entries(vec![shared])).await.unwrap();
    store.save("none.wav", &distinct_fingerprint(50, 10)).await.unwrap();
    store.save("query.wav", &query).await.unwrap();

    let hashes: Vec<HashValue> = query.iter().map(|e| e.hash).collect();
    let candidates = store.candidates_for_hashes(&hashes, Some("query.wav")).await.unwrap();
    assert_eq!(candidates.into_iter().collect::<Vec<_>>(), vec!["far.wav".to_string()]);

    let matching = store.load_matching(&hashes, None).await.unwrap();
    assert_eq!(matching.len(), 2);
    assert_eq!(matching["far.wav"].entries(), &[shared]);
    assert_eq!(matching["query.wav"].len(), 950);
}

#[tokio::test]
async fn test_clear_one_and_all() {
    let (_dir, store) = create_test_store().await.unwrap();
    store.save("a.wav", &distinct_fingerprint(0, 4)).await.unwrap();
    store.save("b.wav", &distinct_fingerprint(1, 6)).await.unwrap();

    assert_eq!(store.clear(Some("a.wav")).await.unwrap(), 4);
    assert_eq!(store.row_count(None).await.unwrap(), 6);
    assert_eq!(store.clear(None).await.unwrap(), 6);
    assert_eq!(store.row_count(None).await.unwrap(), 0);
}
