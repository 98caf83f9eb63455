//! Database access for sonicsim-fp

pub mod fingerprints;
pub mod samples;
pub mod schema;

pub use fingerprints::FingerprintStore;

use sonicsim_common::db::{open_database, open_in_memory};
use sonicsim_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the database at `db_path` and ensure the
/// fingerprint schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = open_database(db_path).await?;
    schema::create_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory database with the fingerprint schema
pub async fn init_in_memory() -> Result<SqlitePool> {
    let pool = open_in_memory().await?;
    schema::create_schema(&pool).await?;
    Ok(pool)
}
