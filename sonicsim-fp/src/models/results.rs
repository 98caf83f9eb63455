//! Fingerprint generation outcomes and match results

use super::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// How far analysis of one file got
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Pipeline ran to completion; the fingerprint may still be empty
    Analyzed,
    /// Decoder produced zero samples
    EmptyAudio,
    /// File could not be opened or decoded
    DecodeFailed(String),
    /// Job was cancelled before it finished
    Cancelled,
}

impl AnalysisStatus {
    pub fn is_analyzed(&self) -> bool {
        matches!(self, AnalysisStatus::Analyzed)
    }
}

/// Fingerprint plus the status it was produced with
///
/// Non-`Analyzed` outcomes always carry an empty fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintOutcome {
    pub fingerprint: Fingerprint,
    pub status: AnalysisStatus,
}

impl FingerprintOutcome {
    pub fn analyzed(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            status: AnalysisStatus::Analyzed,
        }
    }

    pub fn empty_audio() -> Self {
        Self {
            fingerprint: Fingerprint::new(),
            status: AnalysisStatus::EmptyAudio,
        }
    }

    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self {
            fingerprint: Fingerprint::new(),
            status: AnalysisStatus::DecodeFailed(reason.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            fingerprint: Fingerprint::new(),
            status: AnalysisStatus::Cancelled,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status.is_analyzed()
    }
}

/// One ranked candidate from a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Candidate sample path
    pub path: String,
    /// Similarity in `(min_score, max_score]`
    pub score: f64,
    /// Entries in the winning offset bucket
    pub aligned_hashes: usize,
    /// Lower edge of the winning bucket (candidate frame minus query frame)
    pub offset_frames: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FingerprintEntry, HashValue};

    #[test]
    fn test_failure_outcomes_carry_empty_fingerprint() {
        for outcome in [
            FingerprintOutcome::empty_audio(),
            FingerprintOutcome::decode_failed("bad header"),
            FingerprintOutcome::cancelled(),
        ] {
            assert!(outcome.fingerprint.is_empty());
            assert!(!outcome.is_analyzed());
        }
    }

    #[test]
    fn test_analyzed_outcome_keeps_entries() {
        let entry = FingerprintEntry::new(HashValue::pack(10, 20, 3).unwrap(), 7);
        let outcome = FingerprintOutcome::analyzed(Fingerprint::from_entries(vec![entry]));
        assert!(outcome.is_analyzed());
        assert_eq!(outcome.fingerprint.entries(), &[entry]);
    }

    #[test]
    fn test_decode_failed_reason_preserved() {
        let outcome = FingerprintOutcome::decode_failed("no audio track");
        assert_eq!(
            outcome.status,
            AnalysisStatus::DecodeFailed("no audio track".to_string())
        );
    }
}
