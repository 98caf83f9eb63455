//! Database Test Utilities

use anyhow::Result;
use sonicsim_fp::config::StorageConfig;
use sonicsim_fp::db::init_database_pool;
use sonicsim_fp::FingerprintStore;
use tempfile::TempDir;

/// File-backed store with the schema applied
///
/// Returns (TempDir, FingerprintStore) - TempDir must be kept alive for duration of test
pub async fn create_test_store() -> Result<(TempDir, FingerprintStore)> {
    create_store_with(StorageConfig::default()).await
}

/// Store whose lookups and inserts are split into tiny chunks
pub async fn small_batch_store(lookup_batch_size: usize, insert_batch_rows: usize) -> Result<(TempDir, FingerprintStore)> {
    create_store_with(StorageConfig {
        lookup_batch_size,
        insert_batch_rows,
        ..StorageConfig::default()
    })
    .await
}

async fn create_store_with(config: StorageConfig) -> Result<(TempDir, FingerprintStore)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_sonicsim.db");
    let pool = init_database_pool(&db_path).await?;
    Ok((temp_dir, FingerprintStore::new(pool, config)))
}
