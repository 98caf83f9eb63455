//! Similarity search over stored fingerprints
//!
//! Composes the fingerprinter, the store and the matcher into the operations
//! a host application calls: fingerprint a file and persist it, find files
//! that sound like a given one, and backfill fingerprints for registered
//! samples that have none.

use super::fingerprint_service::FingerprintService;
use super::fingerprinter::Fingerprinter;
use super::matcher::Matcher;
use crate::config::{FingerprintConfig, MatchingConfig};
use crate::db::{init_database_pool, FingerprintStore};
use crate::models::{AnalysisStatus, FingerprintOutcome, HashValue, MatchResult};
use serde::{Deserialize, Serialize};
use sonicsim_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Search knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Leave the query file out of its own results
    pub exclude_self: bool,
    /// Maximum number of matches returned
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&MatchingConfig::default())
    }
}

impl SearchOptions {
    /// Exclude the query; limit from `matching.default_limit`
    pub fn from_config(matching: &MatchingConfig) -> Self {
        Self {
            exclude_self: true,
            limit: matching.default_limit,
        }
    }
}

/// Result of [`SimilarityIndex::find_similar`]
///
/// `query_status` separates "could not analyse the query" from "analysed,
/// nothing matched"; both have empty `matches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub query_status: AnalysisStatus,
    pub query_hash_count: usize,
    pub matches: Vec<MatchResult>,
}

/// Counters from one backfill pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillSummary {
    /// Samples picked for this pass
    pub requested: usize,
    /// Fingerprints analysed and saved
    pub stored: usize,
    /// Analysed but produced no hashes (silence, very short files)
    pub empty: usize,
    /// Undecodable or zero-length files
    pub failed: usize,
    /// Jobs cancelled before completion
    pub cancelled: usize,
    /// Analysed but the save failed
    pub storage_errors: usize,
}

/// Fingerprint generation, storage and search
pub struct SimilarityIndex {
    fingerprinter: Arc<Fingerprinter>,
    store: FingerprintStore,
    matcher: Matcher,
}

impl SimilarityIndex {
    pub fn new(fingerprinter: Arc<Fingerprinter>, store: FingerprintStore, matching: MatchingConfig) -> Self {
        Self {
            fingerprinter,
            store,
            matcher: Matcher::new(matching),
        }
    }

    /// Open the configured database and build a symphonia-backed index
    pub async fn open(config: &FingerprintConfig) -> Result<Self> {
        let db_path = config.database_path();
        let pool = init_database_pool(&db_path).await?;
        tracing::info!(path = %db_path.display(), "Similarity index opened");

        Ok(Self::new(
            Arc::new(Fingerprinter::new(config)),
            FingerprintStore::new(pool, config.storage.clone()),
            config.matching.clone(),
        ))
    }

    /// Shared fingerprinter, e.g. for constructing a [`FingerprintService`]
    pub fn fingerprinter(&self) -> Arc<Fingerprinter> {
        Arc::clone(&self.fingerprinter)
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// Fingerprint `path` on the calling thread
    pub fn generate_fingerprint(&self, path: &Path) -> FingerprintOutcome {
        self.fingerprinter.generate_fingerprint(path)
    }

    /// Fingerprint `path` on the blocking pool and persist it if analysed
    ///
    /// An analysed file that yields no hashes still replaces any stale rows.
    pub async fn fingerprint_and_store(&self, path: &Path) -> Result<FingerprintOutcome> {
        let fingerprinter = Arc::clone(&self.fingerprinter);
        let owned: PathBuf = path.to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || fingerprinter.generate_fingerprint(&owned))
            .await
            .map_err(|e| Error::Internal(format!("Fingerprint task failed: {}", e)))?;

        if outcome.is_analyzed() {
            self.store.save(&path_key(path), &outcome.fingerprint).await?;
        }
        Ok(outcome)
    }

    /// Rank stored files by acoustic similarity to `query_path`
    ///
    /// Uses the stored fingerprint when present; otherwise fingerprints the
    /// query and stores it.
    pub async fn find_similar(&self, query_path: &Path, options: SearchOptions) -> Result<SimilarityReport> {
        let key = path_key(query_path);

        let outcome = if self.store.has(&key).await? {
            FingerprintOutcome::analyzed(self.store.load(&key).await?)
        } else {
            self.fingerprint_and_store(query_path).await?
        };

        let query = outcome.fingerprint;
        let exclude = options.exclude_self.then_some(key.as_str());

        let matches = if query.is_empty() {
            Vec::new()
        } else {
            let hashes: Vec<HashValue> = query.hash_set().into_iter().collect();
            let candidates = self.store.load_matching(&hashes, exclude).await?;
            let mut matches = self.matcher.score_candidates(&query, &candidates, exclude);
            matches.truncate(options.limit);
            matches
        };

        tracing::debug!(
            path = %query_path.display(),
            query_hashes = query.len(),
            matches = matches.len(),
            "Similarity search complete"
        );

        Ok(SimilarityReport {
            query_status: outcome.status,
            query_hash_count: query.len(),
            matches,
        })
    }

    /// Fingerprint up to `limit` registered samples that have no rows yet
    ///
    /// A failed save is counted and logged; it does not stop the pass.
    pub async fn backfill<F>(&self, service: &FingerprintService, limit: usize, on_progress: F) -> Result<BackfillSummary>
    where
        F: FnMut(usize, usize, &Path) + Send + 'static,
    {
        let paths = self.store.paths_missing_fingerprint(limit).await?;
        let mut summary = BackfillSummary {
            requested: paths.len(),
            ..Default::default()
        };
        if paths.is_empty() {
            return Ok(summary);
        }

        tracing::info!(count = paths.len(), "Backfilling fingerprints");

        let results = service
            .generate_batch(paths.into_iter().map(PathBuf::from).collect(), on_progress, |_| {})
            .map_err(|e| Error::Internal(format!("Backfill submission failed: {}", e)))?
            .wait()
            .await
            .map_err(|e| Error::Internal(format!("Backfill batch failed: {}", e)))?;

        for (path, outcome) in results {
            match outcome.status {
                AnalysisStatus::Analyzed => {
                    if outcome.fingerprint.is_empty() {
                        summary.empty += 1;
                        continue;
                    }
                    match self.store.save(&path_key(&path), &outcome.fingerprint).await {
                        Ok(()) => summary.stored += 1,
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "Backfill save failed");
                            summary.storage_errors += 1;
                        }
                    }
                }
                AnalysisStatus::EmptyAudio | AnalysisStatus::DecodeFailed(_) => summary.failed += 1,
                AnalysisStatus::Cancelled => summary.cancelled += 1,
            }
        }

        tracing::info!(
            requested = summary.requested,
            stored = summary.stored,
            empty = summary.empty,
            failed = summary.failed,
            cancelled = summary.cancelled,
            storage_errors = summary.storage_errors,
            "Backfill complete"
        );
        Ok(summary)
    }
}

/// Store key for a file path
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
