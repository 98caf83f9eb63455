//! Time-aligned candidate scoring
//!
//! For every hash a candidate shares with the query, the matcher records the
//! offset difference `candidate_frame - query_frame`. Differences are grouped
//! into fixed-width buckets (floored toward negative infinity); a genuine
//! match piles many hashes into one bucket, random collisions spread out.

use crate::config::MatchingConfig;
use crate::models::{Fingerprint, HashValue, MatchResult};
use std::collections::HashMap;

/// Scores candidate fingerprints against a query
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchingConfig,
}

impl Matcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Rank `candidates` by aligned-hash score
    ///
    /// Candidates sharing no hash with the query, or scoring at or below
    /// `min_score`, are omitted. Results are sorted by score descending, then
    /// path ascending. An empty query yields no results.
    pub fn score_candidates<'a, I>(
        &self,
        query: &Fingerprint,
        candidates: I,
        exclude_path: Option<&str>,
    ) -> Vec<MatchResult>
    where
        I: IntoIterator<Item = (&'a String, &'a Fingerprint)>,
    {
        if query.is_empty() {
            return Vec::new();
        }

        // Repeated query hashes keep their last offset
        let lookup: HashMap<HashValue, u32> = query.iter().map(|e| (e.hash, e.offset)).collect();

        let query_len = query.len() as f64;
        let width = self.config.bucket_width;
        let mut results = Vec::new();

        for (path, candidate) in candidates {
            if exclude_path == Some(path.as_str()) {
                continue;
            }

            let mut buckets: HashMap<i64, usize> = HashMap::new();
            for entry in candidate.iter() {
                if let Some(&query_offset) = lookup.get(&entry.hash) {
                    let dt = i64::from(entry.offset) - i64::from(query_offset);
                    *buckets.entry(dt.div_euclid(width) * width).or_insert(0) += 1;
                }
            }

            // Largest bucket; ties resolve to the lowest offset
            let Some((offset, count)) = buckets
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            else {
                continue;
            };

            let score = (count as f64 / query_len * self.config.score_scale).min(self.config.max_score);
            if score > self.config.min_score {
                results.push(MatchResult {
                    path: path.clone(),
                    score,
                    aligned_hashes: count,
                    offset_frames: offset,
                });
            }
        }

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.path.cmp(&b.path))
        });
        results
    }
}
