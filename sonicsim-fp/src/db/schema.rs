//! Fingerprint schema
//!
//! `samples` is the minimal sample registry the fingerprint store needs;
//! richer sample metadata belongs to the host application. Fingerprint rows
//! reference samples by path without a foreign key so files can be
//! fingerprinted before (or without) being registered. The trigger provides
//! the cascade on sample removal.

use sonicsim_common::Result;
use sqlx::SqlitePool;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS samples (
        path TEXT PRIMARY KEY,
        added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fingerprints (
        id INTEGER PRIMARY KEY,
        sample_path TEXT NOT NULL,
        hash_value INTEGER NOT NULL,
        time_offset INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fingerprints_hash ON fingerprints(hash_value)",
    "CREATE INDEX IF NOT EXISTS idx_fingerprints_path ON fingerprints(sample_path)",
    r#"
    CREATE TRIGGER IF NOT EXISTS trg_samples_fingerprint_cascade
    AFTER DELETE ON samples
    FOR EACH ROW
    BEGIN
        DELETE FROM fingerprints WHERE sample_path = OLD.path;
    END
    "#,
];

/// Create tables, indexes and triggers if missing
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for &statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!("Fingerprint schema initialized (samples, fingerprints)");
    Ok(())
}
