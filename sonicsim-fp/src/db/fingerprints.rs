//! Fingerprint persistence
//!
//! Each sample's fingerprint is a set of `(hash_value, time_offset)` rows.
//! Saving replaces the whole set in one transaction, so readers see either
//! the old fingerprint or the new one. Lookups by hash are split into
//! batches to stay under SQLite's bound-parameter limit.

use super::samples;
use crate::config::{StorageConfig, MAX_INSERT_BATCH_ROWS, MAX_LOOKUP_BATCH_SIZE};
use crate::models::{Fingerprint, FingerprintEntry, HashValue};
use crate::utils::retry_on_lock;
use sonicsim_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

/// SQLite-backed fingerprint store
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    pool: SqlitePool,
    config: StorageConfig,
}

impl FingerprintStore {
    /// Wrap a pool whose schema is already initialized
    ///
    /// Batch sizes are clamped to what one SQLite statement can bind.
    pub fn new(pool: SqlitePool, mut config: StorageConfig) -> Self {
        config.insert_batch_rows = config.insert_batch_rows.clamp(1, MAX_INSERT_BATCH_ROWS);
        config.lookup_batch_size = config.lookup_batch_size.clamp(1, MAX_LOOKUP_BATCH_SIZE);
        Self { pool, config }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace the stored fingerprint of `path`
    ///
    /// Retries on a locked database until `max_lock_wait_ms` elapses.
    pub async fn save(&self, path: &str, fingerprint: &Fingerprint) -> Result<()> {
        let started = Instant::now();
        retry_on_lock("fingerprint save", self.config.max_lock_wait_ms, || {
            self.save_once(path, fingerprint)
        })
        .await?;

        tracing::debug!(
            path,
            hash_count = fingerprint.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fingerprint saved"
        );
        Ok(())
    }

    async fn save_once(&self, path: &str, fingerprint: &Fingerprint) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM fingerprints WHERE sample_path = ?")
            .bind(path)
            .execute(&mut *tx)
            .await?;

        for chunk in fingerprint.entries().chunks(self.config.insert_batch_rows) {
            let mut insert: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO fingerprints (sample_path, hash_value, time_offset) ");
            insert.push_values(chunk, |mut row, entry| {
                row.push_bind(path)
                    .push_bind(entry.hash.to_db())
                    .push_bind(i64::from(entry.offset));
            });
            insert.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Stored fingerprint of `path` in insertion order; empty if none
    pub async fn load(&self, path: &str) -> Result<Fingerprint> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT hash_value, time_offset FROM fingerprints WHERE sample_path = ? ORDER BY id",
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(hash, offset)| decode_row(path, hash, offset))
            .collect())
    }

    /// True when `path` has at least one stored row
    pub async fn has(&self, path: &str) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM fingerprints WHERE sample_path = ?)",
        )
        .bind(path)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    /// Paths sharing at least one hash with `hashes`
    pub async fn candidates_for_hashes(
        &self,
        hashes: &[HashValue],
        exclude_path: Option<&str>,
    ) -> Result<BTreeSet<String>> {
        let mut candidates = BTreeSet::new();

        for chunk in distinct(hashes).chunks(self.config.lookup_batch_size) {
            let mut query: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT DISTINCT sample_path FROM fingerprints WHERE ");
            push_hash_filter(&mut query, chunk, exclude_path);

            let paths: Vec<String> = query.build_query_scalar().fetch_all(&self.pool).await?;
            candidates.extend(paths);
        }

        Ok(candidates)
    }

    /// Per candidate path, only the rows whose hash occurs in `hashes`
    ///
    /// Scoring depends on shared hashes alone, so these partial fingerprints
    /// score exactly like the full ones.
    pub async fn load_matching(
        &self,
        hashes: &[HashValue],
        exclude_path: Option<&str>,
    ) -> Result<HashMap<String, Fingerprint>> {
        let started = Instant::now();
        let mut matching: HashMap<String, Fingerprint> = HashMap::new();
        let mut row_count = 0usize;

        for chunk in distinct(hashes).chunks(self.config.lookup_batch_size) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT sample_path, hash_value, time_offset FROM fingerprints WHERE ",
            );
            push_hash_filter(&mut query, chunk, exclude_path);
            query.push(" ORDER BY id");

            let rows: Vec<(String, i64, i64)> = query.build_query_as().fetch_all(&self.pool).await?;
            row_count += rows.len();
            for (path, hash, offset) in rows {
                if let Some(entry) = decode_row(&path, hash, offset) {
                    matching.entry(path).or_default().push(entry);
                }
            }
        }

        tracing::debug!(
            candidates = matching.len(),
            rows = row_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded matching fingerprint rows"
        );
        Ok(matching)
    }

    /// Registered samples with no stored rows, oldest registration first
    pub async fn paths_missing_fingerprint(&self, limit: usize) -> Result<Vec<String>> {
        samples::paths_missing_fingerprint(&self.pool, limit).await
    }

    /// Delete rows for one path, or for every path when `None`
    ///
    /// Returns the number of rows removed.
    pub async fn clear(&self, path: Option<&str>) -> Result<u64> {
        let result = match path {
            Some(path) => {
                sqlx::query("DELETE FROM fingerprints WHERE sample_path = ?")
                    .bind(path)
                    .execute(&self.pool)
                    .await?
            }
            None => sqlx::query("DELETE FROM fingerprints").execute(&self.pool).await?,
        };

        tracing::info!(path = path.unwrap_or("*"), rows = result.rows_affected(), "Fingerprints cleared");
        Ok(result.rows_affected())
    }

    /// Register a sample for backfill; false if already registered
    pub async fn register_sample(&self, path: &str) -> Result<bool> {
        samples::register_sample(&self.pool, path).await
    }

    /// Remove a sample and, through the cascade trigger, its fingerprint
    pub async fn remove_sample(&self, path: &str) -> Result<bool> {
        samples::remove_sample(&self.pool, path).await
    }

    /// Stored rows for one path, or in total
    pub async fn row_count(&self, path: Option<&str>) -> Result<i64> {
        let count: i64 = match path {
            Some(path) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM fingerprints WHERE sample_path = ?")
                    .bind(path)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM fingerprints")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

fn distinct(hashes: &[HashValue]) -> Vec<i64> {
    let set: BTreeSet<i64> = hashes.iter().map(|h| h.to_db()).collect();
    set.into_iter().collect()
}

fn push_hash_filter<'a>(
    query: &mut QueryBuilder<'a, Sqlite>,
    hashes: &'a [i64],
    exclude_path: Option<&'a str>,
) {
    query.push("hash_value IN (");
    let mut values = query.separated(", ");
    for hash in hashes {
        values.push_bind(*hash);
    }
    values.push_unseparated(")");

    if let Some(path) = exclude_path {
        query.push(" AND sample_path <> ").push_bind(path);
    }
}

fn decode_row(path: &str, hash: i64, offset: i64) -> Option<FingerprintEntry> {
    let decoded = HashValue::from_db(hash).zip(u32::try_from(offset).ok());
    if decoded.is_none() {
        tracing::warn!(path, hash, offset, "Skipping out-of-range fingerprint row");
    }
    decoded.map(|(hash, offset)| FingerprintEntry::new(hash, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    fn entry(anchor: u32, target: u32, delta: u32, offset: u32) -> FingerprintEntry {
        FingerprintEntry::new(HashValue::pack(anchor, target, delta).unwrap(), offset)
    }

    async fn store() -> FingerprintStore {
        FingerprintStore::new(init_in_memory().await.unwrap(), StorageConfig::default())
    }

    #[tokio::test]
    async fn test_save_load_preserves_order() {
        let store = store().await;
        let fp = Fingerprint::from_entries(vec![entry(5, 6, 1, 0), entry(1, 2, 3, 4), entry(9, 9, 9, 2)]);
        store.save("a.wav", &fp).await.unwrap();

        assert_eq!(store.load("a.wav").await.unwrap(), fp);
        assert!(store.has("a.wav").await.unwrap());
        assert!(!store.has("b.wav").await.unwrap());
        assert!(store.load("b.wav").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_rows() {
        let store = store().await;
        store
            .save("a.wav", &Fingerprint::from_entries(vec![entry(1, 1, 1, 0), entry(2, 2, 2, 1)]))
            .await
            .unwrap();
        let replacement = Fingerprint::from_entries(vec![entry(3, 3, 3, 7)]);
        store.save("a.wav", &replacement).await.unwrap();

        assert_eq!(store.load("a.wav").await.unwrap(), replacement);
        assert_eq!(store.row_count(Some("a.wav")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_fingerprint_clears_rows() {
        let store = store().await;
        store
            .save("a.wav", &Fingerprint::from_entries(vec![entry(1, 1, 1, 0)]))
            .await
            .unwrap();
        store.save("a.wav", &Fingerprint::new()).await.unwrap();
        assert!(!store.has("a.wav").await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_batch_sizes_are_clamped() {
        let config = StorageConfig {
            insert_batch_rows: 0,
            lookup_batch_size: 0,
            ..StorageConfig::default()
        };
        let store = FingerprintStore::new(init_in_memory().await.unwrap(), config);
        let fp = Fingerprint::from_entries(vec![entry(1, 2, 3, 0), entry(4, 5, 6, 1), entry(7, 8, 9, 2)]);
        store.save("a.wav", &fp).await.unwrap();
        assert_eq!(store.load("a.wav").await.unwrap(), fp);

        let hashes: Vec<HashValue> = fp.iter().map(|e| e.hash).collect();
        assert_eq!(store.load_matching(&hashes, None).await.unwrap()["a.wav"], fp);

        let config = StorageConfig {
            insert_batch_rows: usize::MAX,
            lookup_batch_size: usize::MAX,
            ..StorageConfig::default()
        };
        let store = FingerprintStore::new(init_in_memory().await.unwrap(), config);
        let wide: Fingerprint = (0..MAX_INSERT_BATCH_ROWS as u32 + 5)
            .map(|i| entry(i % 1000, (i / 1000) % 1000, 1 + i % 200, i))
            .collect();
        store.save("wide.wav", &wide).await.unwrap();
        assert_eq!(store.row_count(Some("wide.wav")).await.unwrap(), wide.len() as i64);
    }

    #[tokio::test]
    async fn test_candidates_exclude_path() {
        let store = store().await;
        let shared = entry(10, 20, 5, 0);
        store.save("a.wav", &Fingerprint::from_entries(vec![shared])).await.unwrap();
        store.save("b.wav", &Fingerprint::from_entries(vec![shared, entry(1, 1, 1, 3)])).await.unwrap();
        store.save("c.wav", &Fingerprint::from_entries(vec![entry(7, 7, 7, 0)])).await.unwrap();

        let all = store.candidates_for_hashes(&[shared.hash], None).await.unwrap();
        assert_eq!(all.into_iter().collect::<Vec<_>>(), vec!["a.wav", "b.wav"]);

        let others = store
            .candidates_for_hashes(&[shared.hash], Some("a.wav"))
            .await
            .unwrap();
        assert_eq!(others.into_iter().collect::<Vec<_>>(), vec!["b.wav"]);

        assert!(store.candidates_for_hashes(&[], None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_matching_returns_only_shared_rows() {
        let store = store().await;
        let shared = entry(10, 20, 5, 3);
        store
            .save("b.wav", &Fingerprint::from_entries(vec![entry(1, 1, 1, 0), shared, entry(2, 2, 2, 9)]))
            .await
            .unwrap();

        let matching = store.load_matching(&[shared.hash], None).await.unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching["b.wav"].entries(), &[shared]);
    }

    #[tokio::test]
    async fn test_clear_one_or_all() {
        let store = store().await;
        store.save("a.wav", &Fingerprint::from_entries(vec![entry(1, 1, 1, 0)])).await.unwrap();
        store.save("b.wav", &Fingerprint::from_entries(vec![entry(2, 2, 2, 0)])).await.unwrap();

        assert_eq!(store.clear(Some("a.wav")).await.unwrap(), 1);
        assert!(store.has("b.wav").await.unwrap());
        assert_eq!(store.clear(None).await.unwrap(), 1);
        assert_eq!(store.row_count(None).await.unwrap(), 0);
    }
}
