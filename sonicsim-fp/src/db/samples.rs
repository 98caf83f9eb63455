//! Sample registry operations

use sonicsim_common::Result;
use sqlx::SqlitePool;

/// Register a sample path; returns false if it was already present
pub async fn register_sample(pool: &SqlitePool, path: &str) -> Result<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO samples (path) VALUES (?)")
        .bind(path)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a sample; its fingerprint rows go with it
pub async fn remove_sample(pool: &SqlitePool, path: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM samples WHERE path = ?")
        .bind(path)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Registered samples with no fingerprint rows, in registration order
pub async fn paths_missing_fingerprint(pool: &SqlitePool, limit: usize) -> Result<Vec<String>> {
    let paths: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT s.path
        FROM samples s
        WHERE NOT EXISTS (
            SELECT 1 FROM fingerprints f WHERE f.sample_path = s.path
        )
        ORDER BY s.rowid
        LIMIT ?
        "#,
    )
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;
    Ok(paths)
}
